//! CQ 码编解码
//!
//! 编码时属性按插入顺序输出，值不做转义：字符串原样写出，其余值写为紧凑 JSON。
//! 解码为单次线性扫描，属性值一律为字符串。

use super::Segment;
use serde_json::{Map, Value};

const TAG_OPEN: &str = "[CQ:";

/// 消息段 -> CQ 码字符串
pub fn encode(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        encode_segment(seg, &mut out);
    }
    out
}

fn encode_segment(seg: &Segment, out: &mut String) {
    if seg.kind == "text" {
        if let Some(text) = seg.get_str("text") {
            out.push_str(text);
        }
        return;
    }

    out.push_str(TAG_OPEN);
    out.push_str(&seg.kind);
    for (key, value) in &seg.data {
        out.push(',');
        out.push_str(key);
        out.push('=');
        match value {
            Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
    }
    out.push(']');
}

/// CQ 码字符串 -> 消息段
/// 未闭合的标签按纯文本处理，相邻文本合并为一个段。
pub fn decode(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some(start) = rest.find(TAG_OPEN) {
        text.push_str(&rest[..start]);
        let body_start = &rest[start + TAG_OPEN.len()..];

        let end = body_start.find(']');
        let next_open = body_start.find(TAG_OPEN);
        match (end, next_open) {
            (Some(end), next) if next.is_none_or(|n| end < n) => {
                flush_text(&mut segments, &mut text);
                segments.push(parse_tag(&body_start[..end]));
                rest = &body_start[end + 1..];
            }
            // 标签在下一个 "[CQ:" 之前没有闭合
            (_, Some(n)) => {
                text.push_str(&rest[start..start + TAG_OPEN.len() + n]);
                rest = &body_start[n..];
            }
            (_, None) => {
                text.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    text.push_str(rest);
    flush_text(&mut segments, &mut text);
    segments
}

fn flush_text(segments: &mut Vec<Segment>, text: &mut String) {
    if !text.is_empty() {
        segments.push(Segment::text(std::mem::take(text)));
    }
}

fn parse_tag(body: &str) -> Segment {
    let (kind, params) = body.split_once(',').unwrap_or((body, ""));
    let mut data = Map::new();
    for pair in params.split(',') {
        if let Some((key, value)) = pair.split_once('=') {
            data.insert(key.to_string(), Value::from(value));
        }
    }
    Segment::new(kind, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use serde_json::json;

    fn seg(kind: &str, pairs: &[(&str, &str)]) -> Segment {
        let data = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        Segment::new(kind, data)
    }

    #[test]
    fn encode_text_and_mention() {
        let msg = Message::new().text("A").at(123);
        assert_eq!(msg.to_cq_code(), "A[CQ:at,qq=123]");
    }

    #[test]
    fn encode_keeps_insertion_order() {
        let msg = Message::new().custom_music("http://u", "http://a", "歌", None);
        assert_eq!(
            msg.to_cq_code(),
            "[CQ:music,type=custom,url=http://u,audio=http://a,title=歌]"
        );
    }

    #[test]
    fn encode_non_string_values_as_json() {
        let mut data = Map::new();
        data.insert("id".into(), json!(7));
        data.insert("flag".into(), json!(true));
        let msg = Message::new().add("custom", data).dice();
        assert_eq!(msg.to_cq_code(), "[CQ:custom,id=7,flag=true][CQ:dice]");
    }

    #[test]
    fn decode_mention_between_text() {
        let msg = Message::parse_cq_code("Hello [CQ:at,qq=123456789] World");
        assert_eq!(
            msg.segments(),
            &[
                Segment::text("Hello "),
                seg("at", &[("qq", "123456789")]),
                Segment::text(" World"),
            ]
        );
    }

    #[test]
    fn decode_adjacent_tags_and_params() {
        let segs = decode("[CQ:face,id=1][CQ:image,file=a.jpg,url=http://x/a.jpg?k=v]");
        assert_eq!(
            segs,
            vec![
                seg("face", &[("id", "1")]),
                seg("image", &[("file", "a.jpg"), ("url", "http://x/a.jpg?k=v")]),
            ]
        );
    }

    #[test]
    fn decode_skips_pairs_without_equals() {
        let segs = decode("[CQ:rps][CQ:poke,qq=1,broken]");
        assert_eq!(segs, vec![seg("rps", &[]), seg("poke", &[("qq", "1")])]);
    }

    #[test]
    fn unterminated_tag_is_literal_text() {
        assert_eq!(decode("a[CQ:at,qq=1"), vec![Segment::text("a[CQ:at,qq=1")]);
        assert_eq!(
            decode("x[CQ:at [CQ:face,id=2]y"),
            vec![
                Segment::text("x[CQ:at "),
                seg("face", &[("id", "2")]),
                Segment::text("y"),
            ]
        );
    }

    #[test]
    fn plain_and_empty_input() {
        assert_eq!(decode("just text"), vec![Segment::text("just text")]);
        assert!(decode("").is_empty());
    }
}
