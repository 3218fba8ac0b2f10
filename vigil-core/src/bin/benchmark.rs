fn main() {
    if let Err(e) = run() {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    use serde::Serialize;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::time::Instant;
    use vigil_core::buffering::chunk::AudioChunk;
    use vigil_core::classify::{
        EmergencyClassifier, LegitimacyClassifier, RobotTextDetector, SpamClassifier,
    };
    use vigil_core::tone;

    #[derive(Debug)]
    struct Args {
        fixtures_dir: PathBuf,
        iterations: usize,
        output: Option<PathBuf>,
    }

    #[derive(Debug, Clone, Serialize)]
    struct CaseResult {
        file: String,
        stage: String,
        iteration: usize,
        latency_us: f64,
        positive: bool,
    }

    #[derive(Debug, Clone, Serialize)]
    struct StageSummary {
        stage: String,
        runs: usize,
        p50_latency_us: f64,
        p90_latency_us: f64,
        p99_latency_us: f64,
        avg_latency_us: f64,
        positive_rate: f64,
    }

    #[derive(Debug, Clone, Serialize)]
    struct Summary {
        fixtures_dir: String,
        iterations: usize,
        total_runs: usize,
        total_files: usize,
        stages: Vec<StageSummary>,
        cases: Vec<CaseResult>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut fixtures_dir: Option<PathBuf> = None;
        let mut iterations: usize = 10;
        let mut output: Option<PathBuf> = None;

        let mut it = std::env::args().skip(1).peekable();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--fixtures" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --fixtures".into());
                    };
                    fixtures_dir = Some(PathBuf::from(v));
                }
                "--iterations" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --iterations".into());
                    };
                    iterations = v
                        .parse::<usize>()
                        .map_err(|_| "invalid value for --iterations".to_string())?
                        .clamp(1, 1000);
                }
                "--output" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --output".into());
                    };
                    output = Some(PathBuf::from(v));
                }
                "--help" | "-h" => {
                    println!(
                        "Usage: cargo run -p vigil-core --bin benchmark -- \\
  --fixtures <dir> [--iterations <n>] [--output <file.json>]

Each .wav fixture is timed through tone detection; a sidecar .txt holding
the call transcript additionally times the text classifiers."
                    );
                    std::process::exit(0);
                }
                other => {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }

        let fixtures_dir = fixtures_dir.unwrap_or_else(|| PathBuf::from("benchmarks/fixtures"));
        Ok(Args {
            fixtures_dir,
            iterations,
            output,
        })
    }

    fn collect_wavs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
        let entries = std::fs::read_dir(dir).map_err(|e| e.to_string())?;
        for entry in entries {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();
            if path.is_dir() {
                collect_wavs(&path, out)?;
                continue;
            }
            let is_wav = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if is_wav {
                out.push(path);
            }
        }
        Ok(())
    }

    fn read_wav_mono_i16(path: &Path) -> Result<(Vec<i16>, u32), String> {
        let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| {
                    s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0).round() as i16)
                        .map_err(|e| e.to_string())
                })
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample <= 16 {
                    reader
                        .samples::<i16>()
                        .map(|s| s.map_err(|e| e.to_string()))
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    let shift = spec.bits_per_sample - 16;
                    reader
                        .samples::<i32>()
                        .map(|s| s.map(|v| (v >> shift) as i16).map_err(|e| e.to_string()))
                        .collect::<Result<Vec<_>, _>>()?
                }
            }
        };

        if channels == 1 {
            return Ok((interleaved, spec.sample_rate));
        }

        let mut mono = Vec::with_capacity(interleaved.len() / channels);
        for frame in interleaved.chunks(channels) {
            let sum = frame.iter().map(|&s| i32::from(s)).sum::<i32>();
            mono.push((sum / channels as i32) as i16);
        }
        Ok((mono, spec.sample_rate))
    }

    fn transcript_for(path: &Path) -> Option<String> {
        let sidecar = path.with_extension("txt");
        std::fs::read_to_string(sidecar)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn percentile(values: &[f64], p: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        if sorted.len() == 1 {
            return sorted[0];
        }
        let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    fn summarize(stage: String, rows: &[CaseResult]) -> StageSummary {
        let latencies = rows.iter().map(|r| r.latency_us).collect::<Vec<_>>();
        let avg_latency_us = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };
        let positives = rows.iter().filter(|r| r.positive).count();

        StageSummary {
            stage,
            runs: rows.len(),
            p50_latency_us: percentile(&latencies, 0.50),
            p90_latency_us: percentile(&latencies, 0.90),
            p99_latency_us: percentile(&latencies, 0.99),
            avg_latency_us,
            positive_rate: if rows.is_empty() {
                0.0
            } else {
                positives as f64 / rows.len() as f64
            },
        }
    }

    let args = parse_args()?;
    if !args.fixtures_dir.exists() {
        return Err(format!(
            "fixtures directory not found: {}",
            args.fixtures_dir.display()
        ));
    }

    let mut wav_files = Vec::new();
    collect_wavs(&args.fixtures_dir, &mut wav_files)?;
    wav_files.sort();
    if wav_files.is_empty() {
        return Err(format!(
            "no .wav fixtures found in {}",
            args.fixtures_dir.display()
        ));
    }

    println!(
        "Running Vigil benchmark on {} fixtures (iterations={})",
        wav_files.len(),
        args.iterations
    );

    let robot = RobotTextDetector::new().map_err(|e| e.to_string())?;
    let emergency = EmergencyClassifier::new();
    let legitimacy = LegitimacyClassifier::new();
    let spam = SpamClassifier::new();

    let mut cases = Vec::new();
    for wav in &wav_files {
        let (samples, sample_rate) = read_wav_mono_i16(wav)?;
        let chunk = AudioChunk::new(samples, sample_rate);
        let transcript = transcript_for(wav);
        let file = wav
            .strip_prefix(&args.fixtures_dir)
            .unwrap_or(wav)
            .display()
            .to_string();

        for iteration in 1..=args.iterations {
            let started = Instant::now();
            let report = tone::detect(&chunk);
            cases.push(CaseResult {
                file: file.clone(),
                stage: "tone_detect".into(),
                iteration,
                latency_us: started.elapsed().as_secs_f64() * 1e6,
                positive: report.detected,
            });

            let Some(text) = transcript.as_deref() else {
                continue;
            };

            let started = Instant::now();
            let verdict = robot.detect(text);
            cases.push(CaseResult {
                file: file.clone(),
                stage: "robot_text".into(),
                iteration,
                latency_us: started.elapsed().as_secs_f64() * 1e6,
                positive: verdict.detected,
            });

            let started = Instant::now();
            let hit = emergency.classify(text);
            cases.push(CaseResult {
                file: file.clone(),
                stage: "emergency".into(),
                iteration,
                latency_us: started.elapsed().as_secs_f64() * 1e6,
                positive: hit.is_some(),
            });

            let started = Instant::now();
            let hit = legitimacy.classify(text);
            cases.push(CaseResult {
                file: file.clone(),
                stage: "legitimacy".into(),
                iteration,
                latency_us: started.elapsed().as_secs_f64() * 1e6,
                positive: hit.is_some(),
            });

            let started = Instant::now();
            let hit = spam.classify(text);
            cases.push(CaseResult {
                file: file.clone(),
                stage: "spam".into(),
                iteration,
                latency_us: started.elapsed().as_secs_f64() * 1e6,
                positive: hit.is_some(),
            });
        }
        println!("{file} done");
    }

    let mut grouped: BTreeMap<String, Vec<CaseResult>> = BTreeMap::new();
    for row in &cases {
        grouped
            .entry(row.stage.clone())
            .or_default()
            .push(row.clone());
    }
    let mut stages = Vec::new();
    for (name, rows) in grouped {
        stages.push(summarize(name, &rows));
    }

    let summary = Summary {
        fixtures_dir: args.fixtures_dir.display().to_string(),
        iterations: args.iterations,
        total_runs: cases.len(),
        total_files: wav_files.len(),
        stages,
        cases,
    };

    for stage in &summary.stages {
        println!(
            "{:<12} runs={:<5} p50={:.1}us p90={:.1}us p99={:.1}us positive={:.0}%",
            stage.stage,
            stage.runs,
            stage.p50_latency_us,
            stage.p90_latency_us,
            stage.p99_latency_us,
            stage.positive_rate * 100.0
        );
    }

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote benchmark report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
