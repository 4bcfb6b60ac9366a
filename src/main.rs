// WSPR image marker - Main Entry Point
// Licensed under AGPL v3

use clap::Parser;
use tracing::{error, info, warn};
use wspr_images::config::Config;
use wspr_images::coordinator::Coordinator;
use wspr_images::output::{write_summary, AnnotatedOutput, MarkedImagesOutput};
use wspr_images::reader::{open_input, ReportReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    info!("Starting WSPR image marker");
    info!("Input: {}", config.log.display());

    let engine = config.engine_config();
    let mut coordinator = match Coordinator::new(engine) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    // Outputs are opened before any input is read
    info!("Writing marked images to {}", config.out.display());
    match MarkedImagesOutput::create(&config.out, !config.drop_artifacts) {
        Ok(out) => coordinator.add_output(Box::new(out)),
        Err(e) => {
            error!("Failed to open output file {}: {}", config.out.display(), e);
            return Err(e.into());
        }
    }

    if let Some(path) = &config.annotated {
        info!("Writing solar time annotated reports to {}", path.display());
        match AnnotatedOutput::create(path) {
            Ok(out) => coordinator.add_output(Box::new(out)),
            Err(e) => {
                error!("Failed to open annotated output file {}: {}", path.display(), e);
                return Err(e.into());
            }
        }
    }

    let input = match open_input(&config.log, config.igz) {
        Ok(input) => input,
        Err(e) => {
            error!("Failed to open input file {}: {}", config.log.display(), e);
            return Err(e.into());
        }
    };

    let summary = coordinator.run(ReportReader::new(input))?;
    let stats = &summary.stats;

    info!(
        "Read {} records ({} malformed, {} out of range)",
        stats.records, stats.malformed, stats.out_of_range
    );
    if stats.time_regressions > 0 {
        warn!(
            "{} reports arrived out of time order ({} rejected)",
            stats.time_regressions, stats.rejected
        );
    }
    info!(
        "{} windows, {} groups ({} with more than one report)",
        stats.windows, stats.groups, stats.multi_groups
    );
    info!(
        "{} images in {} groups, {} mains artifacts ({} at 50 Hz, {} at 60 Hz), {} coincident",
        stats.images,
        stats.image_groups,
        stats.artifacts,
        stats.artifacts_50hz,
        stats.artifacts_60hz,
        stats.coincident
    );

    if stats.suspect_excluded > 0 {
        info!("{} reports dropped from flagged receivers", stats.suspect_excluded);
    }
    info!(
        "{} receivers produced images",
        coordinator.detector().receiver_count()
    );
    for flagged in &summary.flagged_receivers {
        warn!(
            "Receiver {} produced images against {} transmitters (threshold {})",
            flagged.receiver_id, flagged.transmitters, summary.rx_suspect_threshold
        );
    }

    if config.prop {
        coordinator.write_count_tables(&config.out)?;
        info!("Wrote image proportion tables next to {}", config.out.display());
    }

    if let Some(path) = &config.summary {
        write_summary(path, &summary)?;
        info!("Wrote run summary to {}", path.display());
    }

    info!("Done");
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_span_events(if verbose {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
