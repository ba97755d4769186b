use anyhow::Context;
use clap::Parser;
use generator::profile::build_clip_from_config;
use gui_bridge::bridge::PresentationBridge;
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use varcore::AnalysisSession;
use workflow::config::WorkflowConfig;
use workflow::runner::AnalysisDriver;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "VAR incident pipeline driver")]
struct Args {
    /// Upload, analyze and write the report without serving
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Video file (mp4, avi or mov) to upload at startup
    #[arg(long, conflicts_with = "demo")]
    video: Option<PathBuf>,
    /// Upload a generated clip instead of a file
    #[arg(long, default_value_t = false)]
    demo: bool,
    #[arg(long, default_value_t = 20)]
    ticks_per_stage: u32,
    #[arg(long, default_value_t = 10)]
    tick_interval_ms: u64,
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// Keep the presentation bridge alive until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn initial_upload(
    args: &Args,
    config: &WorkflowConfig,
) -> anyhow::Result<Option<(String, Vec<u8>)>> {
    if args.demo {
        let clip = build_clip_from_config(&config.demo).context("generating demo clip")?;
        return Ok(Some(("demo.avi".to_string(), clip)));
    }
    let Some(path) = args.video.as_ref() else {
        return Ok(None);
    };
    let bytes = fs::read(path).with_context(|| format!("reading video {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some((name, bytes)))
}

fn run_offline(session: &mut AnalysisSession, config: &WorkflowConfig) -> anyhow::Result<()> {
    let driver = AnalysisDriver::new(config.tick_interval());
    let mut current_stage = None;
    driver.run_blocking(session, |progress| {
        if current_stage != Some(progress.stage_index) {
            current_stage = Some(progress.stage_index);
            println!("[{:>5.1}%] {}", progress.percent, progress.stage_name);
        }
    })?;

    for incident in session.incidents() {
        let seconds = incident.timestamp_seconds() as u64;
        println!(
            "{:02}:{:02} {:<8} {:>3.0}% {}",
            seconds / 60,
            seconds % 60,
            incident.kind().to_string().to_uppercase(),
            incident.confidence() * 100.0,
            incident.description()
        );
        if let Some(declaration) = incident.declaration() {
            println!("      -> {}: {}", declaration.decision(), declaration.short_summary());
        }
    }
    if let Some(results) = session.results() {
        println!(
            "Offline run -> frames {}, incidents {}",
            results.processed_frame_count,
            session.incidents().len()
        );
    }

    let document = session.export().context("exporting report")?;
    let path = document
        .write_to(&config.report_dir)
        .with_context(|| format!("writing report into {}", config.report_dir.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.workflow.as_ref() {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.ticks_per_stage, args.tick_interval_ms)
    };
    if let Some(dir) = args.report_dir.clone() {
        config.report_dir = dir;
    }

    let mut session = config.build_session()?;
    if let Some((name, bytes)) = initial_upload(&args, &config)? {
        let info = session
            .upload(&name, &bytes)
            .with_context(|| format!("uploading {}", name))?;
        println!(
            "Loaded {} -> {} @ {:.0} fps, {} frames, {:.1}s",
            name,
            info.resolution(),
            info.frame_rate,
            info.frame_count,
            info.duration_seconds
        );
    }

    if args.offline {
        run_offline(&mut session, &config)?;
    }

    if args.serve {
        let bridge = PresentationBridge::new(session, config.tick_interval());
        bridge.spawn(config.bind)?;
        println!("Presentation bridge on http://{} (Ctrl+C to stop)...", config.bind);
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
        bridge.shutdown()?;
    } else {
        session.close().context("closing session")?;
    }

    Ok(())
}
