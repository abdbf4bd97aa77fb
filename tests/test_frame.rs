use courier::ws::frame::{
    self, apply_mask, build_frame_header, frame_header_length, opcode, parse_frame_header,
};
use courier::ws::handshake;

/// Payload sizes straddling each length-encoding boundary.
const BOUNDARY_SIZES: &[u64] = &[0, 1, 125, 126, 127, 65535, 65536];

#[test]
fn test_header_round_trip_at_length_boundaries() {
    for &size in BOUNDARY_SIZES {
        for mask in [None, Some([0xDE, 0xAD, 0xBE, 0xEF])] {
            let header = build_frame_header(size, true, opcode::BINARY, mask);
            assert_eq!(frame_header_length(&header), Some(header.len()));

            let parsed = parse_frame_header(&header).unwrap();
            assert!(parsed.fin);
            assert_eq!(parsed.opcode, opcode::BINARY);
            assert_eq!(parsed.masked, mask.is_some());
            assert_eq!(parsed.mask_key, mask);
            assert_eq!(parsed.payload_len, size);
            assert_eq!(parsed.header_len, header.len());
        }
    }
}

#[test]
fn test_length_encoding_widths() {
    // 7-bit, 16-bit, and 64-bit length forms.
    assert_eq!(build_frame_header(125, true, opcode::TEXT, None).len(), 2);
    assert_eq!(build_frame_header(126, true, opcode::TEXT, None).len(), 4);
    assert_eq!(build_frame_header(65535, true, opcode::TEXT, None).len(), 4);
    assert_eq!(build_frame_header(65536, true, opcode::TEXT, None).len(), 10);
}

#[test]
fn test_fin_and_continuation_bits() {
    let header = build_frame_header(0, false, opcode::CONTINUATION, None);
    let parsed = parse_frame_header(&header).unwrap();
    assert!(!parsed.fin);
    assert_eq!(parsed.opcode, opcode::CONTINUATION);
}

#[test]
fn test_control_frames_with_empty_payload() {
    for op in [opcode::CLOSE, opcode::PING, opcode::PONG] {
        let header = build_frame_header(0, true, op, None);
        let parsed = parse_frame_header(&header).unwrap();
        assert_eq!(parsed.opcode, op);
        assert_eq!(parsed.payload_len, 0);
    }
}

#[test]
fn test_partial_header_is_not_an_error() {
    // 16-bit length form needs 4 bytes; only 3 are available.
    let header = build_frame_header(500, true, opcode::BINARY, None);
    assert!(parse_frame_header(&header[..3]).is_none());
    assert!(parse_frame_header(&[]).is_none());
}

#[test]
fn test_rsv_bits_are_exposed() {
    let mut header = build_frame_header(0, true, opcode::TEXT, None);
    header[0] |= 0x40; // rsv1
    let parsed = parse_frame_header(&header).unwrap();
    assert!(parsed.rsv1);
    assert!(!parsed.rsv2);
    assert!(!parsed.rsv3);
}

#[test]
fn test_mask_round_trip_with_random_keys() {
    let payload: Vec<u8> = (0..=255).collect();
    for _ in 0..8 {
        let key = frame::random_mask_key();
        let mut masked = payload.clone();
        apply_mask(&mut masked, key);
        apply_mask(&mut masked, key);
        assert_eq!(masked, payload);
    }
}

#[test]
fn test_masked_wire_frame_decodes() {
    let key = [1, 2, 3, 4];
    let mut wire = build_frame_header(5, true, opcode::TEXT, Some(key));
    let mut payload = b"hello".to_vec();
    apply_mask(&mut payload, key);
    wire.extend_from_slice(&payload);

    let parsed = parse_frame_header(&wire).unwrap();
    let mut decoded = wire[parsed.header_len..].to_vec();
    apply_mask(&mut decoded, parsed.mask_key.unwrap());
    assert_eq!(decoded, b"hello");
}

#[test]
fn test_accept_key_matches_rfc_vector() {
    assert_eq!(
        handshake::accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
        "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
    );
}

#[test]
fn test_validate_accept_detects_mismatch() {
    let key = handshake::generate_key();
    assert!(handshake::validate_accept(&key, &handshake::accept_key(&key)));
    assert!(!handshake::validate_accept(
        &key,
        "c29tZXRoaW5nIGVsc2UgZW50aXJlbHk="
    ));
}
