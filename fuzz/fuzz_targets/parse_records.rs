#![no_main]

use lexrank_core::FeatureMatrixBuilder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let fm = FeatureMatrixBuilder::from_text(&text);

    let matrix = fm.matrix();
    assert_eq!(fm.ids().len(), matrix.row_count());
    assert_eq!(matrix.row_offsets().last().copied(), Some(matrix.nnz()));
    assert!(matrix.values().iter().all(|&w| w >= 0.0));
    assert_eq!(matrix.column_bound(), fm.feature_ids().len());
    assert!(matrix.column_bound() <= matrix.nnz());
});
