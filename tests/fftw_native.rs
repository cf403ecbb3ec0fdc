//! Runs against the installed FFTW, when there is one.

mod common;

use common::assert_close;
use fftwrap::config::LibraryConfig;
use fftwrap::engine::FftwEngine;
use fftwrap::{ComplexBuffer, Direction, Library, Options, Plan, R2rKind, RealBuffer};
use std::sync::Arc;

fn native<T: fftwrap::Real>() -> Option<Library<T>> {
    match FftwEngine::<T>::load(&LibraryConfig::default()) {
        Ok(engine) => Some(Library::from_engine(Arc::new(engine))),
        Err(err) => {
            eprintln!("skipping: {}", err);
            None
        }
    }
}

#[test]
fn fftw_real_round_trip() {
    let Some(library) = native::<f64>() else {
        return;
    };
    assert_eq!(library.name(), "fftw");
    let n = 1000;
    let data: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).cos()).collect();
    let real = Arc::new(RealBuffer::new(&library, n).unwrap());
    let half = Arc::new(ComplexBuffer::new(&library, n / 2 + 1).unwrap());
    let mut forward = Plan::r2c_1d(n, &real, &half, Options::MEASURE).unwrap();
    let mut backward = Plan::c2r_1d(n, &half, &real, Options::MEASURE).unwrap();
    real.set(&data).unwrap();
    forward.execute();
    backward.execute();

    let recovered: Vec<f64> = real.to_vec().iter().map(|x| x / n as f64).collect();
    assert_close(&recovered, &data, 1e-9);
    assert!(forward.describe().is_some());
    let (add, mul, _) = forward.flops();
    assert!(add + mul > 0.0);
}

#[test]
fn fftw_single_matches_reference() {
    let Some(native) = native::<f32>() else {
        return;
    };
    let reference = Library::<f32>::reference();
    let n = 48;
    let data: Vec<f32> = (0..2 * n).map(|i| ((i * 5) % 11) as f32).collect();

    let mut results = Vec::new();
    for library in [&native, &reference] {
        let a = Arc::new(ComplexBuffer::from_interleaved(library, &data).unwrap());
        let b = Arc::new(ComplexBuffer::new(library, n).unwrap());
        let mut plan = Plan::c2c_1d(n, &a, &b, Direction::Forward, Options::ESTIMATE).unwrap();
        plan.execute();
        results.push(b.to_vec());
    }
    for (x, y) in results[0].iter().zip(&results[1]) {
        assert!((x - y).abs() < 1e-2, "{} vs {}", x, y);
    }
}

#[test]
fn fftw_dct_pair() {
    let Some(library) = native::<f64>() else {
        return;
    };
    let data = [1.0, 4.0, 9.0, 16.0, 25.0];
    let a = Arc::new(RealBuffer::from_slice(&library, &data).unwrap());
    let b = Arc::new(RealBuffer::new(&library, data.len()).unwrap());
    let mut forward = Plan::r2r_1d(5, &a, &b, R2rKind::Redft10, Options::ESTIMATE).unwrap();
    let mut backward = Plan::r2r_1d(5, &b, &a, R2rKind::Redft01, Options::ESTIMATE).unwrap();
    forward.execute();
    backward.execute();
    let recovered: Vec<f64> = a.to_vec().iter().map(|x| x / 10.0).collect();
    assert_close(&recovered, &data, 1e-9);
}

#[test]
fn fftw_wisdom_round_trip() {
    let Some(library) = native::<f64>() else {
        return;
    };
    let buffer = Arc::new(ComplexBuffer::new(&library, 128).unwrap());
    Plan::c2c_1d(128, &buffer, &buffer, Direction::Forward, Options::MEASURE).unwrap();

    let path = std::env::temp_dir().join(format!("fftwrap-wisdom-{}.txt", std::process::id()));
    assert!(library.export_wisdom(&path));
    assert!(library.import_wisdom(&path));
    let _ = std::fs::remove_file(&path);
}
