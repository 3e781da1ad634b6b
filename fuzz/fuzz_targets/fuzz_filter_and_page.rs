#![no_main]

use libfuzzer_sys::fuzz_target;
use snapmatch::{filter_and_page, Catalog, Handle, ProductRecord, SearchFilter};

fuzz_target!(|input: (Vec<(String, Option<String>, Option<String>)>, Vec<String>, Option<String>, Option<String>, u8)| {
    let (records, candidates, category, vendor, limit) = input;

    let catalog = Catalog::from_records(records.into_iter().map(|(handle, vendor, kind)| {
        let mut record = ProductRecord::new(handle);
        record.vendor = vendor;
        record.product_type = kind;
        record
    }));
    let candidates: Vec<Handle> = candidates.into_iter().map(Handle::from).collect();
    let filter = SearchFilter { category, vendor };

    let out = filter_and_page(&candidates, &catalog, &filter, limit as usize);
    assert!(out.len() <= limit as usize);
    assert!(out.iter().all(|r| filter.matches(r)));
});
