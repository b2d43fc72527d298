#![no_main]
use libfuzzer_sys::fuzz_target;
use zframe::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut decoder = Decoder::new();
    decoder.max_window_log(20);
    let mut output = Vec::new();
    // we deliberately ignore errors here because random bytes from fuzzer
    // are not valid frames and so are expected to trigger non-fatal errors
    if decoder.feed(data, &mut output).is_ok() {
        let _ = decoder.finish();
    }
});
