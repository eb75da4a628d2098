use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod cq;

/// 消息段 (Segment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Segment {
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text".into(), Value::from(text.into()));
        Self::new("text", data)
    }

    /// 读取字符串属性
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// 消息链，按顺序排列的消息段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Vec<Segment>);

/// 消息内容：纯文本 (可含 CQ 码) 或消息段数组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<Segment>),
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// 通用添加方法：手动构建 Segment
    pub fn add(mut self, kind: impl Into<String>, data: Map<String, Value>) -> Self {
        self.0.push(Segment::new(kind, data));
        self
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    /// 纯文本
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.0.push(Segment::text(text));
        self
    }

    /// @某人
    pub fn at(self, user_id: i64) -> Self {
        self.add("at", attrs([("qq", user_id.to_string())]))
    }

    /// @全体成员
    pub fn at_all(self) -> Self {
        self.add("at", attrs([("qq", "all")]))
    }

    /// QQ 表情
    pub fn face(self, id: i32) -> Self {
        self.add("face", attrs([("id", id.to_string())]))
    }

    /// 图片
    /// - `file`: 文件名、URL、base64:// 或文件路径
    pub fn image(self, file: impl Into<String>, url: Option<&str>) -> Self {
        self.add("image", with_url(file.into(), url))
    }

    /// 以 base64 编码的图片数据
    pub fn image_base64(self, bytes: &[u8]) -> Self {
        let file = format!("base64://{}", BASE64.encode(bytes));
        self.image(file, None)
    }

    /// 语音
    pub fn record(self, file: impl Into<String>, url: Option<&str>) -> Self {
        self.add("record", with_url(file.into(), url))
    }

    /// 视频
    pub fn video(self, file: impl Into<String>, url: Option<&str>) -> Self {
        self.add("video", with_url(file.into(), url))
    }

    /// 文件
    /// - `name`: (可选) 显示的文件名
    pub fn file(self, file: impl Into<String>, name: Option<&str>) -> Self {
        let mut data = attrs([("file", file.into())]);
        if let Some(n) = name {
            data.insert("name".into(), Value::from(n));
        }
        self.add("file", data)
    }

    /// 音乐分享
    /// - `platform`: "qq", "163", "xm" 等
    pub fn music(self, platform: impl Into<String>, id: i64) -> Self {
        self.add(
            "music",
            attrs([("type", platform.into()), ("id", id.to_string())]),
        )
    }

    /// 自定义音乐分享
    pub fn custom_music(
        self,
        url: impl Into<String>,
        audio: impl Into<String>,
        title: impl Into<String>,
        content: Option<&str>,
    ) -> Self {
        let mut data = attrs([
            ("type", "custom".to_string()),
            ("url", url.into()),
            ("audio", audio.into()),
            ("title", title.into()),
        ]);
        if let Some(c) = content {
            data.insert("content".into(), Value::from(c));
        }
        self.add("music", data)
    }

    /// 回复消息
    pub fn reply(self, message_id: i64) -> Self {
        self.add("reply", attrs([("id", message_id.to_string())]))
    }

    /// 合并转发
    pub fn forward(self, id: impl Into<String>) -> Self {
        self.add("forward", attrs([("id", id.into())]))
    }

    /// 转发消息节点 - 自定义内容
    /// - `content`: 纯文本或消息段
    pub fn node(
        self,
        user_id: i64,
        nickname: impl Into<String>,
        content: impl Into<MessageContent>,
    ) -> Self {
        let mut data = attrs([("user_id", user_id.to_string()), ("nickname", nickname.into())]);
        let content = match content.into() {
            MessageContent::Text(s) => Value::from(s),
            // 消息段只含字符串键，序列化不会失败
            MessageContent::Segments(segs) => serde_json::to_value(segs).unwrap_or_default(),
        };
        data.insert("content".into(), content);
        self.add("node", data)
    }

    /// 转发消息节点 - 引用现有消息
    pub fn node_id(self, message_id: i64) -> Self {
        self.add("node", attrs([("id", message_id.to_string())]))
    }

    /// 戳一戳
    pub fn poke(self, user_id: i64) -> Self {
        self.add("poke", attrs([("qq", user_id.to_string())]))
    }

    /// 骰子魔法表情
    pub fn dice(self) -> Self {
        self.add("dice", Map::new())
    }

    /// 猜拳魔法表情
    pub fn rps(self) -> Self {
        self.add("rps", Map::new())
    }

    /// Json 卡片
    pub fn json(self, json_string: impl Into<String>) -> Self {
        self.add("json", attrs([("data", json_string.into())]))
    }

    /// XML 卡片
    pub fn xml(self, xml_string: impl Into<String>) -> Self {
        self.add("xml", attrs([("data", xml_string.into())]))
    }

    pub fn build(self) -> Vec<Segment> {
        self.0
    }

    pub fn build_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 编码为 CQ 码字符串
    pub fn to_cq_code(&self) -> String {
        cq::encode(&self.0)
    }

    /// 解析 CQ 码字符串
    pub fn parse_cq_code(s: &str) -> Self {
        Self(cq::decode(s))
    }
}

fn attrs<V: Into<Value>, const N: usize>(pairs: [(&str, V); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into()))
        .collect()
}

fn with_url(file: String, url: Option<&str>) -> Map<String, Value> {
    let mut data = attrs([("file", file)]);
    if let Some(u) = url.filter(|u| !u.is_empty()) {
        data.insert("url".into(), Value::from(u));
    }
    data
}

// 允许直接从字符串字面量转换为纯文本消息
impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::new().text(s)
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::new().text(s)
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<Message> for MessageContent {
    fn from(m: Message) -> Self {
        MessageContent::Segments(m.build())
    }
}

impl From<Vec<Segment>> for MessageContent {
    fn from(segments: Vec<Segment>) -> Self {
        MessageContent::Segments(segments)
    }
}
