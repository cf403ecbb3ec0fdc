//! Copy-in/copy-out length checks.

use fftwrap::{Complex, ComplexBuffer, FftError, Library, RealBuffer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn real_set_rejects_wrong_lengths(len in 1usize..64, other in 0usize..64) {
        prop_assume!(len != other);
        let library = Library::<f64>::reference();
        let buffer = RealBuffer::from_slice(&library, &vec![7.0; len]).unwrap();

        let source = vec![1.0; other];
        prop_assert_eq!(
            buffer.set(&source),
            Err(FftError::LengthMismatch { expected: len, actual: other })
        );
        let mut target = vec![-1.0; other];
        prop_assert!(buffer.copy_to(&mut target).is_err());

        // Nothing moved in either direction.
        prop_assert!(buffer.to_vec().iter().all(|&x| x == 7.0));
        prop_assert!(target.iter().all(|&x| x == -1.0));
    }

    #[test]
    fn complex_lanes_count_twice(len in 1usize..32) {
        let library = Library::<f32>::reference();
        let buffer = ComplexBuffer::new(&library, len).unwrap();
        prop_assert_eq!(buffer.lanes(), 2 * len);
        prop_assert_eq!(buffer.footprint_bytes(), 2 * len * 4);

        prop_assert!(buffer.set(&vec![0.5f32; len]).is_err());
        prop_assert!(buffer.set(&vec![0.5f32; 2 * len]).is_ok());
        prop_assert!(buffer.set_complex(&vec![Complex::new(1.0, 2.0); len + 1]).is_err());

        let mut complex = vec![Complex::new(0.0f32, 0.0); len];
        buffer.copy_to_complex(&mut complex).unwrap();
        prop_assert!(complex.iter().all(|c| *c == Complex::new(0.5, 0.5)));
    }
}

#[test]
fn matching_lengths_round_trip() {
    let library = Library::<f64>::reference();
    let buffer = ComplexBuffer::from_complex(
        &library,
        &[Complex::new(1.0, -1.0), Complex::new(2.5, 0.25)],
    )
    .unwrap();
    assert_eq!(buffer.to_vec(), vec![1.0, -1.0, 2.5, 0.25]);

    let mut real_parts = vec![0.0; 3];
    assert_eq!(
        buffer.copy_real_parts_to(&mut real_parts),
        Err(FftError::LengthMismatch {
            expected: 2,
            actual: 3
        })
    );
}
