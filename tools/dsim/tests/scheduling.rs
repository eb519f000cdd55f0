mod common;

use common::{engine, ppu_with_sheet, start};
use dsim::ppu::VBLANK_START;
use dynsprite::{
    deferred_flush, DisplayState, Drawn, DynamicSprites, EngineConfig, EngineError, FlushMode, FlushOutcome,
    ObjAttribute, SpriteSize, VblankContext, VblankHook, VideoPort,
};

fn no_flush(_ctx: &mut VblankContext<'_>) {}

fn flush_and_mark(ctx: &mut VblankContext<'_>) {
    ctx.hardware().set_obj_select(0x63);
    ctx.flush();
}

#[test]
fn deferred_flush_runs_at_the_vblank_edge() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Deferred);
    assert_eq!(e.state(), DisplayState::Deferred);
    assert_eq!(e.flush_queue(&mut ppu), Err(EngineError::HookOwnsFlush));

    e.set_frame(0, 3);
    assert_eq!(e.draw(0), Ok(Drawn::Queued));
    e.end_frame_commit();
    assert!(e.scheduler().is_armed());

    let outcome = e.wait_for_vblank(&mut ppu);
    assert_eq!(outcome, FlushOutcome::Flushed { entries: 1, oam: true });
    assert_eq!(ppu.line(), VBLANK_START, "flushed right at the edge");
    assert!(ppu.in_vblank());
    assert!(!e.scheduler().is_armed());
    assert_eq!(e.frame(), 1);
    assert_eq!(dsim::sheet::frame_in_block(&ppu, 0x0000, SpriteSize::Px16), Some(3));
    assert!(!ppu.stats().tearing());
}

#[test]
fn deferred_hook_waits_for_the_commit() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Deferred);

    e.set_frame(0, 1);
    e.draw(0).unwrap();
    // main loop overran: vblank arrives before the commit
    assert_eq!(e.wait_for_vblank(&mut ppu), FlushOutcome::Idle);
    assert_eq!(e.queue().len(), 1);

    e.end_frame_commit();
    assert_eq!(e.wait_for_vblank(&mut ppu), FlushOutcome::Flushed { entries: 1, oam: true });
    assert_eq!(e.frame(), 2);
}

#[test]
fn replacing_the_hook_returns_the_old_one() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Deferred);

    let previous = e.set_vblank_hook(no_flush);
    assert!(previous.is_some_and(|hook| std::ptr::fn_addr_eq(hook, deferred_flush as VblankHook)));

    e.set_frame(0, 2);
    e.draw(0).unwrap();
    e.end_frame_commit();
    assert_eq!(e.wait_for_vblank(&mut ppu), FlushOutcome::Idle);
    assert_eq!(e.queue().len(), 1, "replacement hook does not flush");

    let previous = e.set_vblank_hook(flush_and_mark);
    assert!(previous.is_some_and(|hook| std::ptr::fn_addr_eq(hook, no_flush as VblankHook)));
    assert_eq!(e.wait_for_vblank(&mut ppu), FlushOutcome::Flushed { entries: 1, oam: true });
    assert_eq!(ppu.objsel(), 0x63);
}

#[test]
fn pending_immediate_work_goes_out_in_the_first_window() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Immediate);
    assert!(e.scheduler().hook().is_none());

    e.wait_for_vblank(&mut ppu);
    e.set_frame(0, 4);
    e.draw(0).unwrap();
    e.end_frame_commit();

    // hook registered before the main loop got to flush
    assert!(e.set_vblank_hook(deferred_flush).is_none());
    assert_eq!(e.wait_for_vblank(&mut ppu), FlushOutcome::Flushed { entries: 1, oam: true });
    assert_eq!(e.flush_queue(&mut ppu), Ok(FlushOutcome::Idle));
    assert_eq!(ppu.stats().vram_flushes, 2);
}

#[test]
fn display_can_only_be_enabled_once() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Immediate);
    assert_eq!(e.enable_display(&mut ppu, FlushMode::Deferred), Err(EngineError::AlreadyRunning));
    assert_eq!(e.state(), DisplayState::Immediate);
}

#[test]
fn oversized_frame_tears() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8).with_dma_budget(1_000);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Immediate);

    e.run_frame(&mut ppu, |f| {
        for id in 0..7 {
            f.set_sprite(id, 0, 0, id as u16, ObjAttribute::default());
            f.draw(id)?;
        }
        Ok(())
    })
    .unwrap();

    // slot 0 is unchanged; six tile uploads fit, the oam table does not
    let stats = ppu.stats();
    assert_eq!(stats.overruns, 1);
    assert_eq!(stats.bytes_written, 128 + 544 + 1_000);
    assert!(stats.tearing());
}

#[test]
fn default_budget_fits_a_full_queue() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Deferred);

    for _ in 0..3 {
        e.run_frame(&mut ppu, |f| {
            for id in 0..7 {
                let frame = (f.frame() as u16 + id as u16) % 8;
                f.set_sprite(id, 0, 0, frame, ObjAttribute::default());
                f.draw(id)?;
            }
            Ok(())
        })
        .unwrap();
    }
    assert!(!ppu.stats().tearing());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "flush outside forced blank and vblank")]
fn flushing_during_active_display_asserts() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Immediate);
    assert!(!ppu.in_vblank());

    e.draw(0).unwrap();
    e.end_frame_commit();
    let _ = e.flush_queue(&mut ppu);
}

#[cfg(not(debug_assertions))]
#[test]
fn flushing_during_active_display_is_lost() {
    let mut ppu = ppu_with_sheet(SpriteSize::Px16, 8);
    let mut e: DynamicSprites = engine(EngineConfig::default(), &mut ppu);
    start(&mut e, &mut ppu, FlushMode::Immediate);

    e.draw(0).unwrap();
    e.end_frame_commit();
    assert!(matches!(e.flush_queue(&mut ppu), Ok(FlushOutcome::Flushed { .. })));
    assert_eq!(e.scheduler().stats().timing_violations, 1);
    assert_eq!(ppu.stats().dropped_bytes, 544);
}
