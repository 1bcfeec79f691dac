//! passvault 文档负载：条目列表的 XML 表示
//!
//! ```xml
//! <entries>
//!   <entry>
//!     <title>mail</title>
//!     <user>alice</user>
//!     <password>...</password>
//!   </entry>
//! </entries>
//! ```
//!
//! - `title` 必填且不能为空白；其余字段可选，缺省时不输出元素
//! - 序列化前把 XML 1.0 不允许的字符替换为 `?`
//! - 读取时字段文本逐字保留，首尾空白同样是口令的一部分

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;

use crate::error::VaultError;

/// 单条口令记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// 标题中至少要有一个非空白字符
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.title.trim().is_empty() {
            return Err(VaultError::InvalidEntry("entry title must not be blank".into()));
        }
        Ok(())
    }

    fn sanitized(&self) -> Self {
        let clean = |field: &Option<String>| field.as_deref().map(sanitize_xml);
        Self {
            title: sanitize_xml(&self.title),
            url: clean(&self.url),
            user: clean(&self.user),
            password: clean(&self.password),
            notes: clean(&self.notes),
        }
    }
}

/// 有序的条目集合（XML 根元素 `<entries>`）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename = "entries")]
pub struct Entries {
    pub entry: Vec<Entry>,
}

impl Entries {
    pub fn new(entry: Vec<Entry>) -> Self {
        Self { entry }
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entry.iter()
    }

    /// 序列化为 XML 字节
    ///
    /// 先校验全部标题，再替换非法字符。
    pub fn to_xml(&self) -> Result<Vec<u8>, VaultError> {
        for entry in &self.entry {
            entry.validate()?;
        }

        let clean = Entries {
            entry: self.entry.iter().map(Entry::sanitized).collect(),
        };

        let xml = quick_xml::se::to_string(&clean)?;
        Ok(xml.into_bytes())
    }

    /// 从 XML 解析
    ///
    /// 文本内容逐字保留（包括首尾空白）；未知元素连同其内容一起忽略。
    /// 标题为空白的文档视为格式错误。
    pub fn from_xml<R: BufRead>(reader: R) -> Result<Self, VaultError> {
        let entries = parse_entries(reader)?;

        if let Some(bad) = entries.entry.iter().position(|e| e.validate().is_err()) {
            return Err(VaultError::Format(format!("entry #{} has a blank title", bad + 1)));
        }

        Ok(entries)
    }
}

/// 条目字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Url,
    User,
    Password,
    Notes,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"url" => Some(Self::Url),
            b"user" => Some(Self::User),
            b"password" => Some(Self::Password),
            b"notes" => Some(Self::Notes),
            _ => None,
        }
    }

    fn assign(self, entry: &mut Entry, text: String) {
        match self {
            Self::Title => entry.title = text,
            Self::Url => entry.url = Some(text),
            Self::User => entry.user = Some(text),
            Self::Password => entry.password = Some(text),
            Self::Notes => entry.notes = Some(text),
        }
    }
}

/// 基于事件的解析：`<entries>` / `<entry>` / 字段三层，不裁剪文本
fn parse_entries<R: BufRead>(reader: R) -> Result<Entries, VaultError> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(false).expand_empty_elements(true);

    let mut buf = Vec::new();
    let mut entries = Entries::default();
    let mut seen_root = false;
    // 当前元素深度：1 = entries，2 = entry，3 = 字段
    let mut depth = 0usize;
    let mut current: Option<Entry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                depth += 1;
                let name: &[u8] = start.name().into_inner();
                match depth {
                    1 if seen_root => {
                        return Err(VaultError::Format("more than one root element".into()));
                    }
                    1 if name != b"entries" => {
                        return Err(VaultError::Format("missing <entries> root element".into()));
                    }
                    1 => seen_root = true,
                    2 if name == b"entry" => current = Some(Entry::default()),
                    3 if current.is_some() => {
                        field = Field::from_name(name);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                match depth {
                    3 => {
                        if let (Some(f), Some(entry)) = (field.take(), current.as_mut()) {
                            f.assign(entry, std::mem::take(&mut text));
                        }
                    }
                    2 => {
                        if let Some(entry) = current.take() {
                            entries.entry.push(entry);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(raw) if depth == 3 && field.is_some() => {
                text.push_str(&raw.unescape()?);
            }
            Event::CData(raw) if depth == 3 && field.is_some() => {
                let bytes = raw.into_inner();
                let chunk = std::str::from_utf8(&bytes)
                    .map_err(|e| VaultError::Format(format!("invalid UTF-8 in CDATA: {e}")))?;
                text.push_str(chunk);
            }
            Event::Text(raw) if depth == 0 => {
                if !raw.iter().all(u8::is_ascii_whitespace) {
                    return Err(VaultError::Format("text outside the root element".into()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(VaultError::Format("missing <entries> root element".into()));
    }
    if depth != 0 {
        return Err(VaultError::Format("unexpected end of document".into()));
    }

    Ok(entries)
}

impl From<Vec<Entry>> for Entries {
    fn from(entry: Vec<Entry>) -> Self {
        Self { entry }
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entry.iter()
    }
}

/// 把 XML 1.0 `Char` 产生式之外的字符替换为 `?`
pub fn sanitize_xml(text: &str) -> String {
    text.chars()
        .map(|c| if is_xml_char(c) { c } else { '?' })
        .collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}' | '\u{A}' | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entries {
        Entries::new(vec![
            Entry::new("mail")
                .with_url("https://mail.example.com")
                .with_user("alice")
                .with_password("p<a>ss&\"word'"),
            Entry::new("bank").with_notes("pin in the safe"),
        ])
    }

    #[test]
    fn xml_roundtrip() {
        let entries = sample();
        let xml = entries.to_xml().unwrap();
        let parsed = Entries::from_xml(&xml[..]).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let xml = Entries::new(vec![Entry::new("only title")]).to_xml().unwrap();
        let text = String::from_utf8(xml).unwrap();
        assert!(text.starts_with("<entries>"));
        assert!(text.contains("<title>only title</title>"));
        assert!(!text.contains("<url"));
        assert!(!text.contains("<notes"));
    }

    #[test]
    fn empty_list_roundtrips() {
        let xml = Entries::default().to_xml().unwrap();
        let parsed = Entries::from_xml(&xml[..]).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn control_characters_are_replaced() {
        assert_eq!(sanitize_xml("a\u{0}b\u{1b}c\td\n"), "a?b?c\td\n");
        assert_eq!(sanitize_xml("\u{FFFE}ok"), "?ok");

        let entries = Entries::new(vec![Entry::new("bell\u{7}").with_notes("x\u{8}y")]);
        let parsed = Entries::from_xml(&entries.to_xml().unwrap()[..]).unwrap();
        assert_eq!(parsed.entry[0].title, "bell?");
        assert_eq!(parsed.entry[0].notes.as_deref(), Some("x?y"));
    }

    #[test]
    fn blank_title_is_rejected_on_write() {
        let entries = Entries::new(vec![Entry::new("   ")]);
        assert!(matches!(entries.to_xml(), Err(VaultError::InvalidEntry(_))));
    }

    #[test]
    fn blank_title_is_rejected_on_read() {
        let xml = b"<entries><entry><title> </title></entry></entries>";
        assert!(matches!(Entries::from_xml(&xml[..]), Err(VaultError::Format(_))));
    }

    #[test]
    fn garbage_is_format_error() {
        assert!(matches!(
            Entries::from_xml(&b"\x00\x01not xml at all"[..]),
            Err(VaultError::Format(_))
        ));
    }

    #[test]
    fn edge_whitespace_is_preserved() {
        let entries = Entries::new(vec![
            Entry::new(" mail ")
                .with_password("  secret ")
                .with_notes("\n  indented\r\n"),
            Entry::new("blank fields").with_user("").with_password(" "),
        ]);
        let parsed = Entries::from_xml(&entries.to_xml().unwrap()[..]).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn indented_document_and_unknown_elements() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<entries>
  <entry>
    <title>router</title>
    <created>2009-01-01</created>
    <password><![CDATA[a<b]]></password>
  </entry>
  <group><entry><title>ignored</title></entry></group>
</entries>
"#;
        let parsed = Entries::from_xml(&xml[..]).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.entry[0].title, "router");
        assert_eq!(parsed.entry[0].password.as_deref(), Some("a<b"));
        assert_eq!(parsed.entry[0].url, None);
    }

    #[test]
    fn wrong_root_or_unclosed_document_is_format_error() {
        for xml in [
            &b"<vault><entry><title>x</title></entry></vault>"[..],
            &b"<entries><entry><title>x</title>"[..],
            &b""[..],
        ] {
            assert!(matches!(Entries::from_xml(xml), Err(VaultError::Format(_))));
        }
    }
}
