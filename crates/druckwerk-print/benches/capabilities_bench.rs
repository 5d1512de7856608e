// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for capability synthesis and option resolution.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use druckwerk_core::attributes::{AttrValue, AttributeSet};
use druckwerk_core::driver_data::DriverData;
use druckwerk_core::media::MediaCol;
use druckwerk_core::types::{Finishings, LabelMode, RasterType, Sides};
use druckwerk_print::capabilities::synthesize;
use druckwerk_print::options::{Tiers, resolve};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An office printer with many media sizes, trays and finishings.
fn office_driver() -> DriverData {
    let media: Vec<String> = [
        "na_letter_8.5x11in",
        "na_legal_8.5x14in",
        "iso_a4_210x297mm",
        "iso_a5_148x210mm",
        "na_index-4x6_4x6in",
        "custom_max_8.5x14in",
        "custom_min_3x5in",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let media_default = MediaCol::from_size_name("na_letter_8.5x11in", 635).expect("letter");

    DriverData {
        make_and_model: "Acme Office 9000".into(),
        resolutions: vec![(300, 300), (600, 600), (1200, 1200)],
        resolution_default: (600, 600),
        raster_types: RasterType::BLACK_1 | RasterType::SGRAY_8 | RasterType::SRGB_8,
        sides_supported: Sides::ONE_SIDED | Sides::TWO_SIDED_LONG_EDGE | Sides::TWO_SIDED_SHORT_EDGE,
        finishings: Finishings::PUNCH | Finishings::STAPLE,
        borderless: true,
        bottom_top: 635,
        left_right: 635,
        media,
        media_default: media_default.clone(),
        media_ready: vec![media_default],
        sources: vec!["main".into(), "manual".into(), "tray-1".into()],
        types: vec!["stationery".into(), "labels".into()],
        bins: vec!["face-down".into(), "face-up".into()],
        ..Default::default()
    }
}

fn label_driver() -> DriverData {
    DriverData {
        make_and_model: "Acme Label 4".into(),
        resolutions: vec![(203, 203)],
        mode_supported: LabelMode::TEAR_OFF | LabelMode::PEEL_OFF,
        media: vec!["roll_max_4x40in".into(), "roll_min_0.75x0.25in".into()],
        sources: vec!["main-roll".into()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_synthesize(c: &mut Criterion) {
    let office = office_driver();
    let label = label_driver();

    c.bench_function("synthesize (office)", |b| b.iter(|| synthesize(black_box(&office))));
    c.bench_function("synthesize (label)", |b| b.iter(|| synthesize(black_box(&label))));
}

fn bench_resolve(c: &mut Criterion) {
    let data = office_driver();
    let driver_attrs = synthesize(&data);
    let mut printer = AttributeSet::new();
    printer.add("print-darkness-default", AttrValue::Integer(70));
    let mut job = AttributeSet::new();
    job.add("media", AttrValue::keyword("iso_a4_210x297mm"))
        .add("print-quality", AttrValue::Enum(5))
        .add("copies", AttrValue::Integer(3));

    c.bench_function("resolve options", |b| {
        b.iter(|| {
            let tiers = Tiers {
                job: black_box(&job),
                printer: &printer,
                driver: &driver_attrs,
            };
            resolve(tiers, &data, 1)
        })
    });
}

criterion_group!(benches, bench_synthesize, bench_resolve);
criterion_main!(benches);
