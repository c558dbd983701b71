#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Every accepted row must be cuttable.
    if let Ok(rows) = fence_config::parse_cut_list(data) {
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.inches.is_finite() && r.inches > 0.0));
    }
});
