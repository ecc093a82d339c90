//! Font (`.fnt`).

use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{counted, expect_magic, read_text, ByteCursor};
use crate::value::Record;

/// Every font carries metrics for exactly this many characters
pub(crate) const CHAR_COUNT: u32 = 256;
const CHAR_SIZE: usize = 16;

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut font = Record::new();
    font.insert("magic", expect_magic(cur, "FTTF").at("magic")?);
    font.insert("texture", texture(cur).at("texture")?);
    font.insert("charWidth", cur.read_u32().at("charWidth")?);
    font.insert("charHeight", cur.read_u32().at("charHeight")?);

    let chars = counted(cur, config, CHAR_COUNT, CHAR_SIZE, |cur| {
        Ok(Record::new()
            .with("offsetX", cur.read_u32().at("offsetX")?)
            .with("offsetY", cur.read_u32().at("offsetY")?)
            .with("startX", cur.read_u32().at("startX")?)
            .with("startY", cur.read_u32().at("startY")?))
    })
    .at("chars")?;
    font.insert("chars", chars);
    Ok(font)
}

fn texture(cur: &mut ByteCursor) -> DecodeResult<Record> {
    let magic = expect_magic(cur, "DFNM").at("magic")?;
    let len = cur.read_u32().at("len")?;
    let value = read_text(cur, len as usize).at("value")?;
    Ok(Record::new()
        .with("magic", magic)
        .with("len", len)
        .with("value", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::stream::FixtureWriter;

    fn font_bytes(chars: usize) -> Vec<u8> {
        let mut w = FixtureWriter::new()
            .tag("FTTF")
            .tag("DFNM")
            .u32(17)
            .tag("Fonts\\Console.tex")
            .u32(8)
            .u32(16);
        for i in 0..chars as u32 {
            w = w.u32(i).u32(0).u32(i * 8).u32(0);
        }
        w.finish()
    }

    #[test]
    fn test_font_metrics() {
        let mut cur = ByteCursor::new(font_bytes(256));
        let font = decode(&mut cur, &DecoderConfig::default()).unwrap();
        assert!(cur.is_at_end());

        assert_eq!(font.lookup(&["texture", "value"]).and_then(|v| v.as_str()), Some("Fonts\\Console.tex"));
        assert_eq!(font.get_u32("charHeight"), Some(16));
        let chars = font.get_seq("chars").unwrap();
        assert_eq!(chars.len(), 256);
        assert_eq!(chars[65].as_record().unwrap().get_u32("startX"), Some(520));
    }

    #[test]
    fn test_font_too_few_chars() {
        let err = decode(&mut ByteCursor::new(font_bytes(255)), &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidCount { count: 256, .. }));
        assert_eq!(err.path(), "chars");
    }
}
