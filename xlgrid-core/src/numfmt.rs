//! Date and time number formats.
//!
//! Spreadsheets store dates as serial day numbers and only the cell's number
//! format says they are dates. This module reads the format table out of
//! `styles.xml` and renders date-formatted serials the way a spreadsheet
//! application displays them. Other numeric formats are left to the plain
//! General rendering.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::workbook::{attr_value, xml_error};

/// Built-in number formats that display dates or times.
fn builtin_date_format(id: u32) -> Option<&'static str> {
    match id {
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss"),
        _ => None,
    }
}

/// Whether a format code contains date or time placeholders outside quoted
/// literals, escapes and bracketed modifiers.
pub fn is_date_format(code: &str) -> bool {
    let section = first_section(code);
    let mut chars = section.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let content: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let mut units = content.chars().map(|c| c.to_ascii_lowercase());
                if let Some(unit) = units.next() {
                    if matches!(unit, 'h' | 'm' | 's') && units.all(|c| c == unit) {
                        return true;
                    }
                }
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// The part of a format code used for positive numbers.
fn first_section(code: &str) -> &str {
    let mut in_quotes = false;
    for (idx, ch) in code.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &code[..idx],
            _ => {}
        }
    }
    code
}

/// Number format ids per cell style, from `styles.xml`.
#[derive(Clone, Debug, Default)]
pub struct NumberFormats {
    /// `numFmtId` of each `cellXfs` record, by style index.
    style_formats: Vec<u32>,
    /// Custom format codes by id.
    custom: HashMap<u32, String>,
    date1904: bool,
}

impl NumberFormats {
    /// Read `numFmts` and `cellXfs` from a stylesheet.
    pub fn parse(styles_xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(styles_xml);
        reader.config_mut().trim_text(true);

        let mut formats = NumberFormats::default();
        let mut in_cell_xfs = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        let id = attr_value(&e, b"numFmtId").and_then(|v| v.parse().ok());
                        formats.style_formats.push(id.unwrap_or(0));
                    }
                    b"numFmt" => {
                        let id = attr_value(&e, b"numFmtId").and_then(|v| v.parse().ok());
                        if let (Some(id), Some(code)) = (id, attr_value(&e, b"formatCode")) {
                            formats.custom.insert(id, code);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error("styles.xml", e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(formats)
    }

    pub fn date1904(&self) -> bool {
        self.date1904
    }

    pub fn set_date1904(&mut self, date1904: bool) {
        self.date1904 = date1904;
    }

    /// The date format code applied by `style_index`, if it is a date format.
    pub fn date_format(&self, style_index: Option<u32>) -> Option<&str> {
        let id = *self.style_formats.get(style_index? as usize)?;
        match self.custom.get(&id) {
            Some(code) => is_date_format(code).then_some(code.as_str()),
            None => builtin_date_format(id),
        }
    }

    /// Render `serial` under the style's date format; `None` when the style
    /// is not a date format or the serial is not a representable date.
    pub fn format_date(&self, style_index: Option<u32>, serial: f64) -> Option<String> {
        let code = self.date_format(style_index)?;
        format_serial(serial, code, self.date1904)
    }
}

/// Convert a serial day number to a calendar date and time, to the second.
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_466.0 {
        return None;
    }
    let mut days = serial.floor() as u64;
    let mut seconds = ((serial - days as f64) * 86_400.0).round() as u32;
    if seconds >= 86_400 {
        seconds -= 86_400;
        days += 1;
    }
    // The 1900 system counts a 29 February 1900 that never existed.
    let base = match (date1904, days < 60) {
        (true, _) => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        (false, true) => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        (false, false) => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    let date = base.checked_add_days(Days::new(days))?;
    Some(date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?))
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(String),
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    Elapsed(char),
    AmPm { short: bool },
}

fn tokenize(code: &str) -> Vec<Token> {
    let chars: Vec<char> = first_section(code).chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let run = |pos: usize, target: char| {
        chars[pos..]
            .iter()
            .take_while(|c| c.eq_ignore_ascii_case(&target))
            .count()
    };

    while pos < chars.len() {
        let ch = chars[pos];
        match ch.to_ascii_lowercase() {
            '"' => {
                let literal: String = chars[pos + 1..].iter().take_while(|&&c| c != '"').collect();
                pos += literal.chars().count() + 2;
                tokens.push(Token::Literal(literal));
            }
            '\\' => {
                if let Some(&next) = chars.get(pos + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                pos += 2;
            }
            '_' => {
                tokens.push(Token::Literal(" ".to_string()));
                pos += 2;
            }
            '*' => pos += 2,
            '[' => {
                let content: String = chars[pos + 1..].iter().take_while(|&&c| c != ']').collect();
                pos += content.chars().count() + 2;
                if let Some(unit) = content.chars().next().map(|c| c.to_ascii_lowercase()) {
                    if matches!(unit, 'h' | 'm' | 's') && content.chars().all(|c| c.eq_ignore_ascii_case(&unit)) {
                        tokens.push(Token::Elapsed(unit));
                    }
                }
            }
            'y' => {
                let n = run(pos, 'y');
                tokens.push(Token::Year(n));
                pos += n;
            }
            'm' => {
                let n = run(pos, 'm');
                tokens.push(Token::Month(n));
                pos += n;
            }
            'd' => {
                let n = run(pos, 'd');
                tokens.push(Token::Day(n));
                pos += n;
            }
            'h' => {
                let n = run(pos, 'h');
                tokens.push(Token::Hour(n));
                pos += n;
            }
            's' => {
                let n = run(pos, 's');
                tokens.push(Token::Second(n));
                pos += n;
            }
            'a' => {
                let rest: String = chars[pos..].iter().take(5).collect::<String>().to_ascii_lowercase();
                if rest.starts_with("am/pm") {
                    tokens.push(Token::AmPm { short: false });
                    pos += 5;
                } else if rest.starts_with("a/p") {
                    tokens.push(Token::AmPm { short: true });
                    pos += 3;
                } else {
                    tokens.push(Token::Literal(ch.to_string()));
                    pos += 1;
                }
            }
            _ => {
                tokens.push(Token::Literal(ch.to_string()));
                pos += 1;
            }
        }
    }

    // `m` next to an hour or second placeholder means minutes.
    for idx in 0..tokens.len() {
        let Token::Month(n) = tokens[idx] else {
            continue;
        };
        if n > 2 {
            continue;
        }
        let before = tokens[..idx].iter().rev().find(|t| !matches!(t, Token::Literal(_)));
        let after = tokens[idx + 1..].iter().find(|t| !matches!(t, Token::Literal(_)));
        let is_minute = matches!(before, Some(Token::Hour(_)) | Some(Token::Elapsed('h')))
            || matches!(after, Some(Token::Second(_)) | Some(Token::Elapsed('s')));
        if is_minute {
            tokens[idx] = Token::Minute(n);
        }
    }
    tokens
}

fn padded(value: u32, width: usize) -> String {
    if width >= 2 {
        format!("{:02}", value)
    } else {
        value.to_string()
    }
}

/// Render `serial` with a date/time format code.
pub fn format_serial(serial: f64, code: &str, date1904: bool) -> Option<String> {
    let datetime = serial_to_datetime(serial, date1904)?;
    let tokens = tokenize(code);
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm { .. }));
    let total_seconds = (serial * 86_400.0).round() as u64;

    let mut out = String::new();
    for token in &tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", datetime.year() % 100)),
            Token::Year(_) => out.push_str(&format!("{:04}", datetime.year())),
            Token::Month(n @ (1 | 2)) => out.push_str(&padded(datetime.month(), *n)),
            Token::Month(3) => out.push_str(&datetime.format("%b").to_string()),
            Token::Month(4) => out.push_str(&datetime.format("%B").to_string()),
            Token::Month(_) => out.extend(datetime.format("%B").to_string().chars().take(1)),
            Token::Day(n @ (1 | 2)) => out.push_str(&padded(datetime.day(), *n)),
            Token::Day(3) => out.push_str(&datetime.format("%a").to_string()),
            Token::Day(_) => out.push_str(&datetime.format("%A").to_string()),
            Token::Hour(n) => {
                let hour = datetime.hour();
                let hour = if twelve_hour {
                    match hour % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    hour
                };
                out.push_str(&padded(hour, *n));
            }
            Token::Minute(n) => out.push_str(&padded(datetime.minute(), *n)),
            Token::Second(n) => out.push_str(&padded(datetime.second(), *n)),
            Token::Elapsed('h') => out.push_str(&(total_seconds / 3_600).to_string()),
            Token::Elapsed('m') => out.push_str(&(total_seconds / 60).to_string()),
            Token::Elapsed(_) => out.push_str(&total_seconds.to_string()),
            Token::AmPm { short } => {
                let pm = datetime.hour() >= 12;
                out.push_str(match (short, pm) {
                    (false, false) => "AM",
                    (false, true) => "PM",
                    (true, false) => "A",
                    (true, true) => "P",
                });
            }
        }
    }
    Some(out)
}
