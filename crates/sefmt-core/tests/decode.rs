use pretty_assertions::assert_eq;
use sefmt_core::{
    decode, decode_as, decode_file, DecodeErrorKind, Decoder, DecoderConfig, Error, FormatKind,
    Record, StatsVisitor, Value,
};
use serde_json::json;

/// Little-endian byte builder for fixtures
#[derive(Default)]
struct Fixture(Vec<u8>);

impl Fixture {
    fn new() -> Self {
        Self::default()
    }

    fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn f32(mut self, v: f32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn tag(mut self, v: &str) -> Self {
        self.0.extend_from_slice(v.as_bytes());
        self
    }

    fn ctstring(self, v: &str) -> Self {
        self.u32(v.len() as u32).tag(v)
    }

    fn zeros(mut self, n: usize) -> Self {
        self.0.resize(self.0.len() + n, 0);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

fn minimal(kind: FormatKind) -> Vec<u8> {
    match kind {
        FormatKind::Ba => Fixture::new().tag("ANIM").u32(1).u32(0).finish(),
        FormatKind::Bae => Fixture::new().tag("AEFF").u32(0).finish(),
        FormatKind::Bm => Fixture::new().tag("MESH").u32(16).u32(0).u32(0).finish(),
        FormatKind::Bs => Fixture::new().tag("SKEL").u32(6).u32(0).finish(),
        FormatKind::Fnt => Fixture::new()
            .tag("FTTF")
            .tag("DFNM")
            .ctstring("Fonts\\Small.tex")
            .u32(8)
            .u32(8)
            .zeros(256 * 16)
            .finish(),
        FormatKind::Mdl => Fixture::new()
            .tag("MDAT")
            .tag("V010")
            .u32(0)
            .tag("IVTX").u32(4).u32(0)
            .tag("IFRM").u32(4).u32(0)
            .tag("AFVX").u32(0)
            .tag("AFIN").u32(0)
            .tag("AMMV").u32(0)
            .tag("AVMK").u32(0)
            .tag("IMIP").u32(4).u32(0)
            .tag("FMIP").u32(128).zeros(32 * 4)
            .finish(),
        FormatKind::Wld => Fixture::new().tag("BUIV").u32(10000).tag("WRLD").tag("WEND").finish(),
        FormatKind::Tex => meta_chunks(
            Fixture::new().tag("CTSEMETA").u32(0xABCD1234).u32(3).ctstring("SE2"),
            8,
        )
        .finish(),
    }
}

/// Appends `count` empty object-type chunks to a metadata header
fn meta_chunks(fixture: Fixture, count: usize) -> Fixture {
    (0..count).fold(fixture, |f, _| f.tag("EDTY").u32(0))
}

fn header(record: &Record) -> &Record {
    record.get_record("header").expect("header")
}

#[test]
fn test_minimal_fixtures_decode_completely() {
    let decoder = Decoder::new();
    for kind in FormatKind::ALL {
        let decoded = decoder
            .decode_detailed(minimal(kind), kind)
            .unwrap_or_else(|err| panic!("{kind}: {err}"));
        assert_eq!(decoded.trailing, 0, "{kind}");
        assert_eq!(FormatKind::sniff(&minimal(kind)), Some(kind));
    }
}

#[test]
fn test_minimal_header_fields() {
    let anim = decode_as(minimal(FormatKind::Ba), FormatKind::Ba).unwrap();
    assert_eq!(header(&anim).get_u32("version"), Some(1));

    let skeleton = decode_as(minimal(FormatKind::Bs), FormatKind::Bs).unwrap();
    assert_eq!(header(&skeleton).get_str("magic"), Some("SKEL"));
    assert_eq!(header(&skeleton).get_u32("version"), Some(6));

    let font = decode_as(minimal(FormatKind::Fnt), FormatKind::Fnt).unwrap();
    assert_eq!(
        font.lookup(&["texture", "value"]).and_then(Value::as_str),
        Some("Fonts\\Small.tex")
    );

    let model = decode_as(minimal(FormatKind::Mdl), FormatKind::Mdl).unwrap();
    assert_eq!(header(&model).get_str("version"), Some("V010"));
    assert_eq!(model.get_str("chunkId"), Some("AFVX"));

    let world = decode_as(minimal(FormatKind::Wld), FormatKind::Wld).unwrap();
    assert_eq!(world.lookup(&["buildVersion", "number"]), Some(&Value::from(10000u32)));

    let meta = decode_as(minimal(FormatKind::Tex), FormatKind::Tex).unwrap();
    assert_eq!(header(&meta).get_str("versionString"), Some("SE2"));
    assert_eq!(header(&meta).get_u32("endianess"), Some(0xABCD1234));
}

#[test]
fn test_animation_scenario() {
    let data = Fixture::new().tag("ANIM").u32(1).u32(0).finish();
    let decoded = Decoder::new().decode_detailed(data, FormatKind::Ba).unwrap();
    assert_eq!(decoded.trailing, 0);
    assert_eq!(
        serde_json::to_value(&decoded.record).unwrap(),
        json!({
            "header": {"magic": "ANIM", "version": 1, "animCount": 0},
            "lods": []
        })
    );
}

#[test]
fn test_mesh_scenario() {
    let data = Fixture::new()
        .tag("MESH")
        .u32(16)
        .u32(0)
        .u32(1)
        .zeros(6 * 4)
        .ctstring("")
        .f32(100.0)
        .u32(0b1011)
        .finish();
    let decoded = Decoder::new().decode_detailed(data, FormatKind::Bm).unwrap();
    assert_eq!(decoded.trailing, 0);

    let lods = decoded.record.get_seq("lods").unwrap();
    assert_eq!(lods.len(), 1);
    let lod = lods[0].as_record().unwrap();
    for group in ["vertices", "normals", "uvMaps", "surfaces", "weightMaps", "morphMaps"] {
        assert_eq!(lod.get_seq(group).map(<[Value]>::len), Some(0), "{group}");
    }
    assert_eq!(lod.get("maxDistance").and_then(Value::as_f32), Some(100.0));

    let flags = lod.get("flags").and_then(Value::as_flags).unwrap();
    assert_eq!(flags.get("halfFaceForward"), Some(true));
    assert_eq!(flags.get("fullFaceForward"), Some(true));
    assert_eq!(flags.get("useVertexProgram"), Some(false));
    assert_eq!(flags.get("surfaceRelativeVertices"), Some(true));
    assert_eq!(flags.get("normalizedWeights"), Some(false));
}

#[test]
fn test_corrupt_magic_reports_literal() {
    for kind in FormatKind::ALL {
        if kind == FormatKind::Wld {
            continue;
        }
        let mut data = minimal(kind);
        data[1] ^= 0x20;
        let err = decode_as(data.clone(), kind).unwrap_err();
        let actual = String::from_utf8(data[..kind.magic().len()].to_vec()).unwrap();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::BadMagic {
                expected: kind.magic().to_string(),
                actual
            },
            "{kind}"
        );
        assert_eq!(err.offset(), 0, "{kind}");
    }
}

#[test]
fn test_model_bytes_as_mesh() {
    let err = decode_as(minimal(FormatKind::Mdl), FormatKind::Bm).unwrap_err();
    assert_eq!(
        err.kind(),
        &DecodeErrorKind::BadMagic {
            expected: "MESH".to_string(),
            actual: "MDAT".to_string()
        }
    );
    assert_eq!(err.path(), "header.magic");
}

#[test]
fn test_corrupt_world_start_is_unknown_chunk() {
    let mut data = minimal(FormatKind::Wld);
    data[0] = b'X';
    let err = decode_as(data, FormatKind::Wld).unwrap_err();
    assert_eq!(
        err.kind(),
        &DecodeErrorKind::UnknownChunkTag {
            tag: "XUIV".to_string()
        }
    );
    assert_eq!(err.offset(), 0);
    assert_eq!(err.path(), "trar");
}

#[test]
fn test_oversized_count_fails_before_allocating() {
    let data = Fixture::new().tag("SKEL").u32(6).u32(1_000_000).finish();
    let err = decode_as(data, FormatKind::Bs).unwrap_err();
    assert!(matches!(
        err.kind(),
        DecodeErrorKind::InvalidCount { count: 1_000_000, remaining: 0, .. }
    ));
    assert_eq!(err.path(), "lods");

    let data = Fixture::new().tag("SKEL").u32(6).u32(u32::MAX).finish();
    let err = decode_as(data, FormatKind::Bs).unwrap_err();
    assert!(matches!(err.kind(), DecodeErrorKind::CountLimit { .. }));
}

#[test]
fn test_element_limit() {
    let data = Fixture::new()
        .tag("AEFF")
        .u32(2)
        .tag("ANEF").u8(1).ctstring("walk").u32(0)
        .tag("ANEF").u8(1).ctstring("run").u32(0)
        .finish();
    assert!(decode_as(data.clone(), FormatKind::Bae).is_ok());

    let strict = Decoder::with_config(DecoderConfig::new().max_elements(1));
    let err = strict.decode(data, FormatKind::Bae).unwrap_err();
    assert!(matches!(err.kind(), DecodeErrorKind::CountLimit { .. }));
    assert_eq!(err.path(), "effects");
}

#[test]
fn test_bytes_after_metadata_chunks_are_trailing() {
    let data = Fixture::new()
        .tag("CTSEMETA")
        .u32(0)
        .u32(3)
        .ctstring("SE2")
        .tag("INFO").u32(1).u32(0).u32(0).u32(0).u32(0);
    let data = meta_chunks(data, 7).zeros(40).finish();
    let decoded = Decoder::new().decode_detailed(data, FormatKind::Tex).unwrap();
    let chunks = header(&decoded.record).get_seq("chunks").unwrap();
    assert_eq!(chunks.len(), 8);
    assert_eq!(chunks[0].as_record().unwrap().get_str("type"), Some("INFO"));
    assert!(chunks
        .iter()
        .skip(1)
        .all(|c| c.as_record().and_then(|c| c.get_str("type")) == Some("EDTY")));
    assert_eq!(decoded.trailing, 40);
}

#[test]
fn test_metadata_with_fewer_than_eight_chunks_fails() {
    let data = Fixture::new()
        .tag("CTSEMETA")
        .u32(0)
        .u32(3)
        .ctstring("SE2")
        .tag("IDNT").u32(1).u32(0).ctstring("CEntity")
        .finish();
    let err = Decoder::new().decode(data, FormatKind::Tex).unwrap_err();
    assert!(matches!(err.kind(), DecodeErrorKind::InvalidCount { count: 8, .. }));
    assert_eq!(err.path(), "header.chunks");
}

#[test]
fn test_world_missing_end_is_strict_by_default() {
    let data = Fixture::new()
        .tag("BUIV")
        .u32(1)
        .tag("WRLD")
        .tag("DPOS")
        .u32(3)
        .finish();
    let err = decode_as(data.clone(), FormatKind::Wld).unwrap_err();
    assert!(matches!(err.kind(), DecodeErrorKind::Truncated { .. }));

    let lenient = Decoder::with_config(DecoderConfig::new().lenient_world_chunks(true));
    let world = lenient.decode(data, FormatKind::Wld).unwrap();
    let chunks = world.lookup(&["world", "chunks"]).and_then(Value::as_seq).unwrap();
    assert_eq!(chunks.len(), 1);
}

#[test]
fn test_decoding_is_deterministic() {
    let decoder = Decoder::new();
    for kind in FormatKind::ALL {
        let data = bytes_of(kind);
        let first = decoder.decode(data.clone(), kind).unwrap();
        let second = decoder.decode(data, kind).unwrap();
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn test_concurrent_decodes_agree() {
    let data = bytes_of(FormatKind::Fnt);
    let decoder = Decoder::new();
    let expected = decoder.decode(data.clone(), FormatKind::Fnt).unwrap();

    let results: Vec<Record> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let data = data.clone();
                let decoder = &decoder;
                scope.spawn(move || decoder.decode(data, FormatKind::Fnt).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for record in results {
        assert_eq!(record, expected);
    }
}

fn bytes_of(kind: FormatKind) -> bytes::Bytes {
    bytes::Bytes::from(minimal(kind))
}

#[test]
fn test_decode_by_key() {
    let record = decode(minimal(FormatKind::Bae), ".BAE").unwrap();
    assert_eq!(header(&record).get_u32("count"), Some(0));

    let err = decode(minimal(FormatKind::Bae), "psd").unwrap_err();
    assert!(matches!(err, Error::UnknownFormat { ref key } if key == "psd"));
}

#[test]
fn test_decode_file() {
    let dir = tempfile::tempdir().unwrap();

    let skeleton = dir.path().join("Player.bs");
    std::fs::write(&skeleton, minimal(FormatKind::Bs)).unwrap();
    let record = decode_file(&skeleton).unwrap();
    assert_eq!(header(&record).get_str("magic"), Some("SKEL"));

    let sniffed = dir.path().join("walk.bin");
    std::fs::write(&sniffed, minimal(FormatKind::Ba)).unwrap();
    assert_eq!(header(&decode_file(&sniffed).unwrap()).get_str("magic"), Some("ANIM"));

    let unknown = dir.path().join("notes.txt");
    std::fs::write(&unknown, b"hello").unwrap();
    assert!(matches!(decode_file(&unknown), Err(Error::UnknownFormat { .. })));

    let missing = dir.path().join("missing.bm");
    assert!(matches!(decode_file(&missing), Err(Error::FileRead { .. })));
}

#[test]
fn test_stats_over_decoded_font() {
    let font = decode_as(minimal(FormatKind::Fnt), FormatKind::Fnt).unwrap();
    let mut stats = StatsVisitor::default();
    sefmt_core::value::walk(&font, &mut stats);
    assert_eq!(stats.seq_count, 1);
    assert_eq!(stats.record_count, 1 + 1 + 256);
    assert_eq!(stats.empty_count, 0);
}
