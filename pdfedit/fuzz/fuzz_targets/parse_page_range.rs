#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfedit::range::PageRange;

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(range) = PageRange::parse(spec) else {
        return;
    };

    let reparsed = PageRange::parse(&range.to_string()).expect("display output must parse");
    assert_eq!(reparsed, range);

    for page_count in [1usize, 7, 1000] {
        if let Ok(indices) = range.to_indices(page_count) {
            assert!(!indices.is_empty());
            assert!(indices.windows(2).all(|w| w[0] < w[1]));
            assert!(indices.iter().all(|&i| i < page_count));
        }
        if let Ok(groups) = range.groups(page_count) {
            assert!(groups.iter().all(|g| !g.is_empty()));
        }
    }
});
