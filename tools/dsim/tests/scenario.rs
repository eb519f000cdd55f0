use dsim::{
    scenario::{self, Scenario},
    sheet::frame_in_block,
};
use dynsprite::{EngineConfig, FlushMode, OverflowPolicy, SpriteSize, VramMap};

fn assert_final_frames(scenario: &Scenario, ppu: &dsim::SimPpu) {
    let map = VramMap::new(&EngineConfig::default());
    for id in 0..scenario.sprites {
        let block = map.destination(id, SpriteSize::Px16).unwrap();
        let expected = scenario.frame_of(id, scenario.frames) as u8;
        assert_eq!(frame_in_block(ppu, block, SpriteSize::Px16), Some(expected), "sprite {id}");
    }
}

#[test]
fn deferred_demo_runs_clean() {
    let scenario = Scenario {
        frames: 120,
        ..Scenario::default()
    };
    let (report, ppu) = scenario::run(&scenario).unwrap();

    assert_eq!(report.setup_frames, 1);
    assert_eq!(report.sim.uploads_at_display_on, Some(2));
    assert_eq!(report.flushed_frames, 120, "every commit is flushed once");
    assert_eq!(report.draws.deferred, 0);
    // one upload per sprite per animation step
    assert_eq!(report.flush.entries, 7 + 7 * (120 / 6));
    assert!(!report.sim.tearing());
    assert_final_frames(&scenario, &ppu);
}

#[test]
fn immediate_demo_runs_clean() {
    let scenario = Scenario {
        frames: 60,
        mode: FlushMode::Immediate,
        ..Scenario::default()
    };
    let (report, ppu) = scenario::run(&scenario).unwrap();
    assert!(!report.sim.tearing());
    assert_eq!(report.flush.timing_violations, 0);
    assert_final_frames(&scenario, &ppu);
}

#[test]
fn crowded_frames_spill_into_later_vblanks() {
    let scenario = Scenario {
        sprites: 20,
        frames: 604,
        ..Scenario::default()
    };
    let (report, ppu) = scenario::run(&scenario).unwrap();

    assert_eq!(report.setup_frames, 3);
    assert!(report.draws.deferred > 0);
    assert_eq!(report.draws.evicted, 0);
    assert!(!report.sim.tearing());
    assert_final_frames(&scenario, &ppu);
}

#[test]
fn eviction_also_converges() {
    let scenario = Scenario {
        sprites: 20,
        frames: 605,
        overflow: OverflowPolicy::EvictOldest,
        ..Scenario::default()
    };
    let (report, ppu) = scenario::run(&scenario).unwrap();

    assert!(report.draws.evicted > 0);
    assert_eq!(report.draws.deferred, 0);
    assert_final_frames(&scenario, &ppu);
}

#[test]
fn too_many_sprites_is_an_error() {
    let scenario = Scenario {
        sprites: 65,
        ..Scenario::default()
    };
    let err = scenario::run(&scenario).unwrap_err();
    assert!(err.to_string().contains("65 sprites"));
}

#[test]
fn oam_dump_is_the_full_table() {
    let scenario = Scenario {
        frames: 10,
        ..Scenario::default()
    };
    let (_, ppu) = scenario::run(&scenario).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oam.bin");
    scenario::dump_oam(&ppu, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 544);
    assert_eq!(&bytes[..], &ppu.oam()[..]);
}
