use std::collections::VecDeque;

use buggy_core::codec::{Command, FrameParser, MAX_FRAME_LEN, encode_frame};
use buggy_core::ring_buffer::RingBuffer;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
    Write(Vec<u8>),
    Read(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Push),
        Just(Op::Pop),
        proptest::collection::vec(any::<u8>(), 0..12).prop_map(Op::Write),
        (0usize..12).prop_map(Op::Read),
    ]
}

proptest! {
    #[test]
    fn ring_buffer_matches_a_bounded_queue(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        const N: usize = 8;
        let mut rb = RingBuffer::<N>::new();
        let mut model: VecDeque<u8> = VecDeque::new();
        for op in ops {
            match op {
                Op::Push(b) => {
                    let fits = model.len() < N - 1;
                    prop_assert_eq!(rb.push(b), fits);
                    if fits {
                        model.push_back(b);
                    }
                }
                Op::Pop => prop_assert_eq!(rb.pop(), model.pop_front()),
                Op::Write(bytes) => {
                    let n = rb.write(&bytes);
                    prop_assert_eq!(n, bytes.len().min(N - 1 - model.len()));
                    model.extend(&bytes[..n]);
                }
                Op::Read(len) => {
                    let mut out = vec![0u8; len];
                    let n = rb.read(&mut out);
                    let expected: Vec<u8> = model.drain(..len.min(model.len())).collect();
                    prop_assert_eq!(&out[..n], &expected[..]);
                }
            }
            prop_assert_eq!(rb.available() + rb.available_to_write(), N - 1);
            prop_assert_eq!(rb.available(), model.len());
        }
    }

    #[test]
    fn formatted_frames_parse_back(code in proptest::char::range('A', 'z').prop_filter("letter", |c| c.is_ascii_alphabetic()), value in any::<u32>()) {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = encode_frame(code, value, &mut buf);
        let mut parser = FrameParser::new();
        let mut got = Vec::new();
        parser.feed(frame, |c| got.push(c));
        prop_assert_eq!(got, vec![Command::new(code, value)]);
    }

    #[test]
    fn fragmentation_does_not_change_the_result(
        bytes in proptest::collection::vec(prop_oneof![
            Just(b','), Just(b'x'), Just(b'Q'), Just(b' '), (b'0'..=b'9')
        ], 0..80),
        split in 0usize..80,
    ) {
        let whole = {
            let mut p = FrameParser::new();
            let mut v = Vec::new();
            p.feed(&bytes, |c| v.push(c));
            v
        };
        let split = split.min(bytes.len());
        let mut p = FrameParser::new();
        let mut v = Vec::new();
        p.feed(&bytes[..split], |c| v.push(c));
        p.feed(&bytes[split..], |c| v.push(c));
        prop_assert_eq!(whole, v);
    }
}

#[test]
fn wrap_scenario_matches_unbounded_queue() {
    let mut rb = RingBuffer::<8>::new();
    let mut model: VecDeque<u8> = VecDeque::new();
    assert_eq!(rb.write(&[1, 2, 3, 4, 5, 6]), 6);
    model.extend([1, 2, 3, 4, 5, 6]);
    for _ in 0..4 {
        assert_eq!(rb.pop(), model.pop_front());
    }
    let n = rb.write(&[7, 8, 9, 10, 11, 12]);
    assert_eq!(n, 5);
    model.extend(&[7, 8, 9, 10, 11, 12][..n]);
    let mut out = [0u8; 8];
    let got = rb.read(&mut out);
    assert_eq!(&out[..got], model.iter().copied().collect::<Vec<_>>().as_slice());
}
