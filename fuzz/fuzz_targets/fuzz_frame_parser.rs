#![no_main]
use buggy_core::codec::MAX_FRAME_LEN;
use buggy_core::{FrameParser, RingBuffer, TextAssembler, encode_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whole-slice and byte-at-a-time parsing through a ring buffer must agree.
    let mut whole = FrameParser::new();
    let mut expected = Vec::new();
    whole.feed(data, |c| expected.push(c));

    let mut rb = RingBuffer::<64>::new();
    let mut split = FrameParser::new();
    let mut got = Vec::new();
    let mut text = TextAssembler::new();
    for chunk in data.chunks(17) {
        let mut written = 0;
        while written < chunk.len() {
            written += rb.write(&chunk[written..]);
            while let Some(b) = rb.pop() {
                if let Some(c) = split.push(b) {
                    if c.code == TextAssembler::CODE {
                        let _ = text.push(c.value);
                    }
                    got.push(c);
                }
            }
        }
    }
    assert_eq!(expected, got);

    // every parsed command re-encodes to a frame that parses back to itself
    for cmd in expected {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = encode_frame(cmd.code, cmd.value, &mut buf);
        let mut p = FrameParser::new();
        let mut back = Vec::new();
        p.feed(frame, |c| back.push(c));
        assert_eq!(back, vec![cmd]);
    }
});
