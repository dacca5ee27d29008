//! Frame codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use wirecall_core::protocol::codec::EnvelopeDecoder;

mod vector_loader;
use vector_loader::load;

#[test]
fn frame_vectors() {
    let files = [
        "control_min.json",
        "attachment_first.json",
        "control_first.json",
        "bad_json.json",
        "unknown_kind.json",
        "short_attachment.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.frame.decode();

        // Byte-at-a-time feeding exercises every partial-header path.
        let mut dec = EnvelopeDecoder::default();
        let mut got = Vec::new();
        let mut err = None;
        for b in &raw {
            dec.extend(std::slice::from_ref(b));
            loop {
                match dec.next_envelope() {
                    Ok(Some(env)) => got.push(env),
                    Ok(None) => break,
                    Err(e) => {
                        err = Some(e);
                        break;
                    }
                }
            }
            if err.is_some() {
                break;
            }
        }

        if let Some(ex) = v.expect_error {
            let e = err.expect("expected error");
            assert_eq!(e.client_code().as_str(), ex.code, "vector={}", v.description);
            continue;
        }

        assert!(err.is_none(), "vector={} err={err:?}", v.description);
        let ex = v.expect.expect("missing expect block");
        assert_eq!(got.len(), ex.len(), "vector={}", v.description);
        for (env, want) in got.iter().zip(ex.iter()) {
            assert_eq!(env.id, want.id, "vector={}", v.description);
            assert_eq!(env.action, want.action, "vector={}", v.description);
            assert_eq!(env.binary.as_ref().map(|b| b.len()), want.binary_len, "vector={}", v.description);
        }
        assert!(dec.is_idle(), "vector={}", v.description);
    }
}

#[test]
fn bad_json_does_not_poison_the_stream() {
    let v = load("bad_json.json");
    let good = load("control_min.json");

    let mut dec = EnvelopeDecoder::default();
    dec.extend(&v.frame.decode());
    dec.extend(&good.frame.decode());

    assert!(dec.next_envelope().is_err());
    assert!(!dec.is_poisoned());
    let env = dec.next_envelope().unwrap().unwrap();
    assert_eq!(env.action, "getUser");
}

#[test]
fn framing_error_poisons_the_stream() {
    let v = load("unknown_kind.json");
    let good = load("control_min.json");

    let mut dec = EnvelopeDecoder::default();
    dec.extend(&v.frame.decode());
    dec.extend(&good.frame.decode());

    assert!(dec.next_envelope().is_err());
    assert!(dec.is_poisoned());
    assert!(dec.next_envelope().is_err());
}

#[test]
fn short_attachment_does_not_poison_the_stream() {
    let v = load("short_attachment.json");
    let good = load("control_min.json");

    let mut dec = EnvelopeDecoder::default();
    dec.extend(&v.frame.decode());
    dec.extend(&good.frame.decode());

    let err = dec.next_envelope().unwrap_err();
    assert!(!err.is_fatal_for_stream());
    assert!(!dec.is_poisoned());
    let env = dec.next_envelope().unwrap().unwrap();
    assert_eq!(env.action, "getUser");
}
