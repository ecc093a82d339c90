//! Bone animation (`.ba`).

use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{
    counted, expect_magic, read_ctstring, read_matrix12, ByteCursor, CTSTRING_MIN, MATRIX12_SIZE,
};
use crate::value::{Blob, Record};

const ANIMATION_MIN: usize = 2 * CTSTRING_MIN + 7 * 4;
const BONE_ENVELOPE_MIN: usize = CTSTRING_MIN + MATRIX12_SIZE + 3 * 4;
const POSITION_SIZE: usize = 16;
const ROTATION_SIZE: usize = 20;
const MORPH_ENVELOPE_MIN: usize = CTSTRING_MIN + 4;

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut header = Record::new();
    header.insert("magic", expect_magic(cur, "ANIM").at("magic").at("header")?);
    header.insert("version", cur.read_u32().at("version").at("header")?);
    let anim_count = cur.read_u32().at("animCount").at("header")?;
    header.insert("animCount", anim_count);

    let lods = counted(cur, config, anim_count, ANIMATION_MIN, |cur| animation(cur, config)).at("lods")?;

    Ok(Record::new().with("header", header).with("lods", lods))
}

fn animation(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut anim = Record::new();
    anim.insert("sourceFile", read_ctstring(cur).at("sourceFile")?);
    anim.insert("id", read_ctstring(cur).at("id")?);
    anim.insert("secsPerFrame", cur.read_f32().at("secsPerFrame")?);
    anim.insert("frameCount", cur.read_u32().at("frameCount")?);
    anim.insert("threshold", cur.read_f32().at("threshold")?);
    anim.insert("isCompressed", cur.read_u32().at("isCompressed")?);
    anim.insert("isCustomSpeed", cur.read_u32().at("isCustomSpeed")?);

    let bone_count = cur.read_u32().at("boneEnvelopeCount")?;
    anim.insert("boneEnvelopeCount", bone_count);
    let bones = counted(cur, config, bone_count, BONE_ENVELOPE_MIN, |cur| {
        bone_envelope(cur, config)
    })
    .at("boneEnvelopes")?;
    anim.insert("boneEnvelopes", bones);

    let morph_count = cur.read_u32().at("morphEnvelopeCount")?;
    anim.insert("morphEnvelopeCount", morph_count);
    let morphs = counted(cur, config, morph_count, MORPH_ENVELOPE_MIN, |cur| {
        morph_envelope(cur, config)
    })
    .at("morphEnvelopes")?;
    anim.insert("morphEnvelopes", morphs);

    Ok(anim)
}

fn bone_envelope(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut env = Record::new();
    env.insert("id", read_ctstring(cur).at("id")?);
    env.insert("defaultPos", read_matrix12(cur).at("defaultPos")?);

    let position_count = cur.read_u32().at("positionCount")?;
    env.insert("positionCount", position_count);
    let positions = counted(cur, config, position_count, POSITION_SIZE, position).at("positions")?;
    env.insert("positions", positions);

    let rotation_count = cur.read_u32().at("rotationCount")?;
    env.insert("rotationCount", rotation_count);
    let rotations = counted(cur, config, rotation_count, ROTATION_SIZE, |cur| {
        let offset = cur.position();
        cur.read_bytes(ROTATION_SIZE).map(|bytes| Blob::new(bytes, offset))
    })
    .at("rotations")?;
    env.insert("rotations", rotations);

    env.insert("offsetLength", cur.read_f32().at("offsetLength")?);
    Ok(env)
}

fn position(cur: &mut ByteCursor) -> DecodeResult<Record> {
    let frame = cur.read_u16().at("frameNumber")?;
    let x = cur.read_f32().at("x")?;
    let y = cur.read_f32().at("y")?;
    let z = cur.read_f32().at("z")?;
    let offset = cur.position();
    let pad = cur.read_bytes(2).at("pad")?;
    Ok(Record::new()
        .with("frameNumber", frame)
        .with("x", x)
        .with("y", y)
        .with("z", z)
        .with("pad", Blob::new(pad, offset)))
}

fn morph_envelope(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut env = Record::new();
    env.insert("id", read_ctstring(cur).at("id")?);
    let factor_count = cur.read_u32().at("factorCount")?;
    env.insert("factorCount", factor_count);
    let factors = counted(cur, config, factor_count, 4, ByteCursor::read_f32).at("factors")?;
    env.insert("factors", factors);
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::stream::FixtureWriter;
    use crate::value::{Text, Value};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn decode_bytes(data: Vec<u8>) -> DecodeResult<Record> {
        decode(&mut ByteCursor::new(data), &DecoderConfig::default())
    }

    #[test]
    fn test_empty_animation_file() {
        let mut cur = ByteCursor::new(FixtureWriter::new().tag("ANIM").u32(1).u32(0).finish());
        let record = decode(&mut cur, &DecoderConfig::default()).unwrap();

        let expected = Record::new()
            .with(
                "header",
                Record::new()
                    .with("magic", Text::new(Bytes::from_static(b"ANIM"), 0))
                    .with("version", 1u32)
                    .with("animCount", 0u32),
            )
            .with("lods", Vec::<Value>::new());
        assert_eq!(record, expected);
        assert!(cur.is_at_end());
    }

    #[test]
    fn test_animation_with_envelopes() {
        let mut w = FixtureWriter::new()
            .tag("ANIM")
            .u32(1)
            .u32(1)
            .ctstring("Anims\\Walk.aa")
            .ctstring("Walk")
            .f32(0.05)
            .u32(20)
            .f32(0.0)
            .u32(0)
            .u32(1)
            .u32(1)
            .ctstring("Pelvis");
        for i in 0..12 {
            w = w.f32(i as f32);
        }
        let data = w
            .u32(1)
            .u16(3)
            .f3(1.0, 2.0, 3.0)
            .u16(0)
            .u32(1)
            .zeros(ROTATION_SIZE)
            .f32(0.5)
            .u32(1)
            .ctstring("Blink")
            .u32(2)
            .f32(0.25)
            .f32(0.75)
            .finish();

        let record = decode_bytes(data).unwrap();
        let lods = record.get_seq("lods").unwrap();
        assert_eq!(lods.len(), 1);

        let anim = lods[0].as_record().unwrap();
        assert_eq!(anim.get_str("id"), Some("Walk"));
        assert_eq!(anim.get_u32("frameCount"), Some(20));

        let bone = anim.get_seq("boneEnvelopes").unwrap()[0].as_record().unwrap();
        assert_eq!(bone.get_str("id"), Some("Pelvis"));
        let pos = bone.get_seq("positions").unwrap()[0].as_record().unwrap();
        assert_eq!(pos.get("frameNumber"), Some(&Value::from(3u16)));
        assert_eq!(pos.get("z").and_then(Value::as_f32), Some(3.0));
        let rotation = bone.get_seq("rotations").unwrap()[0].as_blob().unwrap();
        assert_eq!(rotation.len(), ROTATION_SIZE);

        let morph = anim.get_seq("morphEnvelopes").unwrap()[0].as_record().unwrap();
        assert_eq!(
            morph.get_seq("factors").unwrap(),
            &[Value::from(0.25f32), Value::from(0.75f32)]
        );
    }

    #[test]
    fn test_bad_magic() {
        let err = decode_bytes(FixtureWriter::new().tag("ANIX").u32(1).u32(0).finish()).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::BadMagic {
                expected: "ANIM".to_string(),
                actual: "ANIX".to_string()
            }
        );
        assert_eq!(err.path(), "header.magic");
    }

    #[test]
    fn test_huge_anim_count() {
        let err = decode_bytes(FixtureWriter::new().tag("ANIM").u32(1).u32(1_000_000).finish())
            .unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidCount { count: 1_000_000, .. }));
        assert_eq!(err.path(), "lods");
        assert_eq!(err.offset(), 12);
    }

    #[test]
    fn test_truncated_envelope_path() {
        let data = FixtureWriter::new()
            .tag("ANIM")
            .u32(1)
            .u32(1)
            .ctstring("a")
            .ctstring("b")
            .f32(0.1)
            .u32(1)
            .f32(0.0)
            .u32(0)
            .u32(0)
            .u32(1)
            .ctstring("Bone")
            .zeros(MATRIX12_SIZE)
            .u32(0)
            .u32(0)
            .finish();
        let err = decode_bytes(data).unwrap_err();
        assert_eq!(err.path(), "lods[0].boneEnvelopes[0].offsetLength");
    }
}
