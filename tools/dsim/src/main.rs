use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dsim::{
    ppu::VBLANK_DMA_BYTES,
    scenario::{self, Scenario},
};
use dynsprite::{FlushMode, OverflowPolicy, DEFAULT_BUDGET};
use tracing::{info, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    /// Flush from the main loop right after vblank starts.
    Immediate,
    /// Flush from the vblank hook.
    Deferred,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Overflow {
    /// Push excess uploads to later frames.
    Defer,
    /// Drop the oldest pending upload.
    Evict,
}

/// Run the animated sprite demo against the simulated PPU.
#[derive(Parser, Debug)]
#[command(name = "dsim", version, about)]
struct Args {
    /// Number of animated 16x16 sprites.
    #[arg(short, long, default_value_t = DEFAULT_BUDGET)]
    sprites: usize,

    /// Frames to run once the display is on.
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Frames between animation steps.
    #[arg(short, long, default_value_t = 6)]
    period: u32,

    /// Frames in the generated sprite sheet.
    #[arg(long, default_value_t = 8)]
    sheet_frames: u16,

    #[arg(short, long, value_enum, default_value_t = Mode::Deferred)]
    mode: Mode,

    /// What a full upload queue does.
    #[arg(long, value_enum, default_value_t = Overflow::Defer)]
    overflow: Overflow,

    /// DMA bytes that fit in one vertical blank.
    #[arg(long, default_value_t = VBLANK_DMA_BYTES)]
    dma_budget: usize,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Write the final OAM contents to this file.
    #[arg(long)]
    dump_oam: Option<PathBuf>,
}

fn setup_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .finish()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.log_level);

    let scenario = Scenario {
        sprites: args.sprites,
        frames: args.frames,
        period: args.period,
        sheet_frames: args.sheet_frames,
        mode: match args.mode {
            Mode::Immediate => FlushMode::Immediate,
            Mode::Deferred => FlushMode::Deferred,
        },
        overflow: match args.overflow {
            Overflow::Defer => OverflowPolicy::DeferNewest,
            Overflow::Evict => OverflowPolicy::EvictOldest,
        },
        dma_budget: args.dma_budget,
    };

    let (report, ppu) = scenario::run(&scenario)?;

    info!(
        setup_frames = report.setup_frames,
        frames = report.frames,
        flushed_frames = report.flushed_frames,
        uploads = report.flush.entries,
        oam_uploads = report.flush.oam_uploads,
        "run finished"
    );
    info!(
        queued = report.draws.queued,
        replaced = report.draws.replaced,
        deferred = report.draws.deferred,
        evicted = report.draws.evicted,
        "draw results"
    );
    info!(
        transfers = report.sim.transfers,
        bytes = report.sim.bytes_written,
        uploads_before_display = report.sim.uploads_at_display_on.unwrap_or(0),
        "dma"
    );
    if report.sim.tearing() {
        warn!(
            overruns = report.sim.overruns,
            dropped_bytes = report.sim.dropped_bytes,
            "tearing: uploads did not fit in vblank"
        );
    }

    if let Some(path) = &args.dump_oam {
        scenario::dump_oam(&ppu, path)?;
        info!("oam written to {}", path.display());
    }
    Ok(())
}
