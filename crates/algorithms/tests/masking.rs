//! Cloud mask behavior on a synthetic scene with known surfaces
//!
//! The scene (see `common`) holds a 10x10 cloud, a 2-pixel cloud speck, a
//! dark shadow patch south of the cloud, a water body and a snow field on
//! a vegetated background.

mod common;

use bandwise_algorithms::masking::{acca_mask, fmask_mask};
use bandwise_algorithms::prelude::*;
use common::{init_tracing, landsat_scene, SIZE};

fn acca_params() -> AccaParams {
    AccaParams {
        erosion_size: 1,
        options: KernelOptions::sequential(),
        ..AccaParams::default()
    }
}

fn fmask_params() -> FmaskParams {
    FmaskParams {
        p2: 1,
        options: KernelOptions::sequential(),
        ..FmaskParams::default()
    }
}

#[test]
fn acca_labels_known_surfaces() {
    init_tracing();
    let result = acca_mask(&landsat_scene(), &acca_params()).unwrap();
    let mask = &result.mask;
    let at = |r, c| mask.get(r, c).unwrap();

    assert_eq!(at(15, 15), AccaClass::Cloud.code(), "cloud core");
    assert_eq!(at(9, 9), AccaClass::Cloud.code(), "one-pixel dilation ring");
    assert_eq!(at(8, 8), AccaClass::Clear.code(), "beyond the dilation ring");
    assert_eq!(at(3, 32), AccaClass::Snow.code(), "snow field");
    assert_eq!(at(34, 5), AccaClass::Clear.code(), "water is not cloud");
    assert_eq!(at(35, 30), AccaClass::Clear.code(), "speck below min_pixels removed");
}

#[test]
fn acca_cloud_cover_metadata() {
    let out = acca(&landsat_scene(), &acca_params()).unwrap();
    // 12x12 dilated block out of 1600 pixels
    assert_eq!(out.metadata().get("CLOUDCOVER").map(String::as_str), Some("9.00"));
    assert_eq!(out.metadata().get("ACCA_PASS2").map(String::as_str), Some("applied"));
    assert_eq!(out.band_names(), vec!["acca"]);
    assert_eq!(out.shape(), (SIZE, SIZE));
}

#[test]
fn acca_keeps_nodata() {
    let scene = landsat_scene();
    let mut bands = scene.into_bands();
    let lwir = bands[0].raster().clone();
    let mut holed = lwir;
    holed.set(0, 0, -9999.0).unwrap();
    bands[0] = Band::new("lwir", holed);
    let scene = Image::new("holed", bands).unwrap();

    let result = acca_mask(&scene, &acca_params()).unwrap();
    assert_eq!(result.mask.get(0, 0).unwrap(), MASK_NODATA);
}

#[test]
fn fmask_labels_known_surfaces() {
    init_tracing();
    let result = fmask_mask(&landsat_scene(), &fmask_params()).unwrap();
    let mask = &result.mask;
    let at = |r, c| mask.get(r, c).unwrap();

    assert_eq!(at(15, 15), FmaskClass::Cloud.code(), "cloud core");
    assert_eq!(at(20, 15), FmaskClass::Cloud.code(), "cloud dilation wins over shadow");
    assert_eq!(at(23, 15), FmaskClass::Shadow.code(), "dark NIR pit");
    assert_eq!(at(34, 5), FmaskClass::Water.code(), "water body");
    assert_eq!(at(3, 32), FmaskClass::Snow.code(), "snow field");
    assert_eq!(at(35, 30), FmaskClass::Clear.code(), "speck removed");
    assert_eq!(at(5, 20), FmaskClass::Clear.code(), "vegetation");
}

#[test]
fn fmask_class_percentages_sum_to_hundred() {
    let out = fmask(&landsat_scene(), &fmask_params()).unwrap();
    let total: f64 = FmaskClass::ALL
        .iter()
        .map(|c| {
            out.metadata()
                .get(&format!("FMASK_{}", c.name()))
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap()
        })
        .sum();
    assert!((total - 100.0).abs() < 0.05, "percentages sum to {}", total);
    assert!(out.metadata().contains_key("CLOUDCOVER"));
}

#[test]
fn masks_are_deterministic_across_modes() {
    let scene = landsat_scene();
    let seq_params = fmask_params();
    let par_params = FmaskParams {
        options: KernelOptions::default().with_block_rows(7),
        ..fmask_params()
    };
    let a = fmask_mask(&scene, &seq_params).unwrap();
    let b = fmask_mask(&scene, &par_params).unwrap();
    assert_eq!(a.mask.data(), b.mask.data(), "Fmask differs between modes");

    let a = acca_mask(&scene, &acca_params()).unwrap();
    let b = acca_mask(
        &scene,
        &AccaParams {
            options: KernelOptions::default().with_block_rows(3),
            ..acca_params()
        },
    )
    .unwrap();
    assert_eq!(a.mask.data(), b.mask.data(), "ACCA differs between modes");
}

#[test]
fn fmask_rejects_out_of_range_tolerance() {
    let params = FmaskParams {
        p1: 9,
        ..fmask_params()
    };
    let err = fmask(&landsat_scene(), &params).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "p1"));
}

#[test]
fn masks_require_thermal_band() {
    let scene = landsat_scene();
    let bands: Vec<Band> = scene.into_bands().into_iter().skip(1).collect();
    let no_thermal = Image::new("no_lwir", bands).unwrap();

    for err in [
        acca(&no_thermal, &acca_params()).unwrap_err(),
        fmask(&no_thermal, &fmask_params()).unwrap_err(),
    ] {
        assert!(
            matches!(err, Error::MissingBand { ref band, .. } if band == "LWIR"),
            "unexpected error {:?}",
            err
        );
    }
}

#[test]
fn cancelled_mask_stops() {
    let token = CancelToken::new();
    token.cancel();
    let params = FmaskParams {
        options: KernelOptions::default().with_cancel(token),
        ..fmask_params()
    };
    assert!(matches!(fmask(&landsat_scene(), &params), Err(Error::Cancelled)));
}
