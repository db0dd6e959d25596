//! Human-readable text serialization of messages.
//!
//! Supports the subset of the protobuf text format that graph definitions
//! use in practice:
//!
//! ```text
//! # comment
//! node {
//!   name: "a"
//!   op: "Const"
//!   attr { key: "dtype" value { type: DT_FLOAT } }
//! }
//! versions { producer: 21 }
//! ```
use nom::branch::alt;
use nom::bytes::complete::take_while;
use nom::character::complete::{char, multispace1, one_of, satisfy};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::{many0, separated_list0};
use nom::sequence::preceded;
use nom::{IResult, Parser};

use crate::MalformedInput;
use crate::codec::RECURSION_LIMIT;
use crate::schema::{FieldDesc, Kind, MessageDesc, Packed, Schema, Sink, Slot, Value};

#[derive(Clone, Debug, PartialEq)]
enum Scalar {
    Str(Vec<u8>),
    Ident(String),
    Number(String),
}

#[derive(Clone, Debug, PartialEq)]
enum TextValue {
    Scalar(Scalar),
    Block(Vec<TextField>),
    List(Vec<TextValue>),
}

#[derive(Clone, Debug, PartialEq)]
struct TextField {
    name: String,
    /// Length of the input left when the field starts, to locate errors.
    rest: usize,
    value: TextValue,
}

/// Parses the text form of a message.
pub fn parse<M: Schema + Default>(doc: &str) -> Result<M, MalformedInput> {
    let mut message = M::default();
    merge(&mut message, doc)?;
    Ok(message)
}

/// Parses the text form of a message on top of what `message` already holds.
pub fn merge(message: &mut dyn Schema, doc: &str) -> Result<(), MalformedInput> {
    let fields = match document(doc) {
        Ok(("", fields)) => fields,
        Ok((rest, _)) => return Err(located(doc, rest.len(), "unexpected input".to_string())),
        Err(nom::Err::Failure(e)) if e.code == nom::error::ErrorKind::TooLarge => {
            return Err(MalformedInput::RecursionLimit(RECURSION_LIMIT));
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(located(doc, e.input.len(), format!("syntax error ({:?})", e.code)));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(located(doc, 0, "unexpected end of input".to_string()));
        }
    };
    apply(message, &fields).map_err(|(rest, reason)| located(doc, rest, reason))
}

/// Renders a message in text form. Parsing the result yields the same message.
pub fn to_text(message: &dyn Schema) -> String {
    let mut printer = Printer { out: String::new(), indent: 0, desc: message.schema() };
    message.fields(&mut crate::schema::Emit::new(&mut printer));
    printer.out
}

fn located(doc: &str, rest: usize, reason: String) -> MalformedInput {
    let offset = doc.len().saturating_sub(rest);
    let line = doc.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1;
    MalformedInput::Text { line, reason }
}

// PARSING

fn space(i: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, preceded(char('#'), take_while(|c: char| c != '\n'))))))
        .parse(i)
}

fn document(i: &str) -> IResult<&str, Vec<TextField>> {
    let (i, fields) = many0(|i| field(i, RECURSION_LIMIT)).parse(i)?;
    let (i, _) = space(i)?;
    Ok((i, fields))
}

fn identifier(i: &str) -> IResult<&str, &str> {
    recognize((
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(i)
}

/// Budget left for one more level of `{ }` or `[ ]` nesting.
fn nested(i: &str, depth: u32) -> Result<u32, nom::Err<nom::error::Error<&str>>> {
    depth.checked_sub(1).ok_or_else(|| {
        nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::TooLarge))
    })
}

fn field(i: &str, depth: u32) -> IResult<&str, TextField> {
    let (i, _) = space(i)?;
    let rest = i.len();
    let (i, name) = identifier(i)?;
    let (i, _) = space(i)?;
    let (i, colon) = opt(char(':')).parse(i)?;
    let (i, _) = space(i)?;
    let (i, value) = if colon.is_some() {
        field_value(i, depth)?
    } else {
        map(|i| block(i, depth), TextValue::Block).parse(i)?
    };
    let (i, _) = space(i)?;
    let (i, _) = opt(one_of(",;")).parse(i)?;
    Ok((i, TextField { name: name.to_string(), rest, value }))
}

fn block(i: &str, depth: u32) -> IResult<&str, Vec<TextField>> {
    let (i, _) = char('{').parse(i)?;
    let depth = nested(i, depth)?;
    let (i, fields) = many0(|i| field(i, depth)).parse(i)?;
    let (i, _) = space(i)?;
    let (i, _) = char('}').parse(i)?;
    Ok((i, fields))
}

fn field_value(i: &str, depth: u32) -> IResult<&str, TextValue> {
    alt((
        map(|i| block(i, depth), TextValue::Block),
        map(|i| list(i, depth), TextValue::List),
        map(scalar, TextValue::Scalar),
    ))
    .parse(i)
}

fn list(i: &str, depth: u32) -> IResult<&str, Vec<TextValue>> {
    let (i, _) = char('[').parse(i)?;
    let depth = nested(i, depth)?;
    let (i, _) = space(i)?;
    let (i, items) =
        separated_list0((space, char(','), space), |i| field_value(i, depth)).parse(i)?;
    let (i, _) = (space, char(']')).parse(i)?;
    Ok((i, items))
}

fn scalar(i: &str) -> IResult<&str, Scalar> {
    alt((
        map(string_literal, Scalar::Str),
        map(number, |s: &str| Scalar::Number(s.to_string())),
        map(recognize((char('-'), identifier)), |s: &str| Scalar::Number(s.to_string())),
        map(identifier, |s: &str| Scalar::Ident(s.to_string())),
    ))
    .parse(i)
}

fn number(i: &str) -> IResult<&str, &str> {
    recognize((
        opt(char('-')),
        satisfy(|c| c.is_ascii_digit() || c == '.'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '.' || c == '+' || c == '-'),
    ))
    .parse(i)
}

fn string_literal(i: &str) -> IResult<&str, Vec<u8>> {
    fn fail(at: &str) -> IResult<&str, Vec<u8>> {
        Err(nom::Err::Error(nom::error::Error::new(at, nom::error::ErrorKind::Escaped)))
    }
    let bytes = i.as_bytes();
    let quote = match bytes.first().copied() {
        Some(q @ (b'"' | b'\'')) => q,
        _ => return fail(i),
    };
    let mut out = vec![];
    let mut ix = 1;
    while ix < bytes.len() {
        match bytes[ix] {
            b if b == quote => return Ok((&i[ix + 1..], out)),
            b'\\' => {
                ix += 1;
                match bytes.get(ix).copied() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(c @ (b'\\' | b'\'' | b'"' | b'?')) => out.push(c),
                    Some(b'x') => {
                        let digits: Vec<u8> = bytes[ix + 1..]
                            .iter()
                            .take(2)
                            .take_while(|c| c.is_ascii_hexdigit())
                            .copied()
                            .collect();
                        let Ok(v) = u8::from_str_radix(&String::from_utf8_lossy(&digits), 16)
                        else {
                            return fail(i);
                        };
                        out.push(v);
                        ix += digits.len();
                    }
                    Some(b'0'..=b'7') => {
                        let digits: Vec<u8> = bytes[ix..]
                            .iter()
                            .take(3)
                            .take_while(|c| (b'0'..=b'7').contains(c))
                            .copied()
                            .collect();
                        let v = digits.iter().fold(0u32, |acc, d| acc * 8 + (d - b'0') as u32);
                        if v > 255 {
                            return fail(i);
                        }
                        out.push(v as u8);
                        ix += digits.len() - 1;
                    }
                    _ => return fail(i),
                }
            }
            b => out.push(b),
        }
        ix += 1;
    }
    fail(i)
}

// APPLYING

type Located = (usize, String);

fn apply(message: &mut dyn Schema, fields: &[TextField]) -> Result<(), Located> {
    let desc = message.schema();
    for f in fields {
        let Some(field) = desc.field_by_name(&f.name) else {
            return Err((f.rest, format!("{} has no field named {}", desc.name, f.name)));
        };
        match &f.value {
            TextValue::List(items) => {
                for item in items {
                    apply_value(message, desc, field, item, f.rest)?
                }
            }
            value => apply_value(message, desc, field, value, f.rest)?,
        }
    }
    Ok(())
}

fn apply_value(
    message: &mut dyn Schema,
    desc: &'static MessageDesc,
    field: &'static FieldDesc,
    value: &TextValue,
    rest: usize,
) -> Result<(), Located> {
    let Some(slot) = message.slot(field.number) else {
        return Err((rest, format!("{}.{} can not be set", desc.name, field.name)));
    };
    match (slot, value) {
        (Slot::Message(m), TextValue::Block(fields)) => apply(m, fields),
        (Slot::Messages(list), TextValue::Block(fields)) => apply(list.push_default(), fields),
        (Slot::Map(map), TextValue::Block(fields)) => {
            let mut key = None;
            let mut entry_value = None;
            for f in fields {
                match (f.name.as_str(), &f.value) {
                    ("key", TextValue::Scalar(Scalar::Str(k))) => key = Some(k.clone()),
                    ("value", TextValue::Block(v)) => entry_value = Some(v),
                    (other, _) => {
                        return Err((f.rest, format!("unexpected {other} in map entry")));
                    }
                }
            }
            let key = String::from_utf8(key.unwrap_or_default())
                .map_err(|_| (rest, format!("map key of {} is not UTF-8", field.name)))?;
            let target = map.replace_entry(key);
            match entry_value {
                Some(fields) => apply(target, fields),
                None => Ok(()),
            }
        }
        (slot, TextValue::Scalar(s)) => set_scalar(slot, field.kind, s)
            .map_err(|reason| (rest, format!("{}.{}: {}", desc.name, field.name, reason))),
        _ => Err((rest, format!("{}.{}: unexpected value", desc.name, field.name))),
    }
}

fn as_number(s: &Scalar) -> Result<&str, String> {
    match s {
        Scalar::Number(n) => Ok(n.trim_end_matches(['f', 'F'])),
        Scalar::Ident(n) => Ok(n),
        Scalar::Str(_) => Err("expected a number, found a string".to_string()),
    }
}

fn float<F: std::str::FromStr>(s: &Scalar) -> Result<F, String> {
    let n = as_number(s)?;
    let n = match n.to_ascii_lowercase().as_str() {
        "inf" | "infinity" => "inf".to_string(),
        "-inf" | "-infinity" => "-inf".to_string(),
        "nan" => "NaN".to_string(),
        _ => n.to_string(),
    };
    n.parse::<F>().map_err(|_| format!("invalid float {n}"))
}

fn int<I: std::str::FromStr>(s: &Scalar) -> Result<I, String> {
    let n = as_number(s)?;
    n.parse::<I>().map_err(|_| format!("invalid integer {n}"))
}

fn boolean(s: &Scalar) -> Result<bool, String> {
    match as_number(s)? {
        "true" | "True" | "t" | "1" => Ok(true),
        "false" | "False" | "f" | "0" => Ok(false),
        other => Err(format!("invalid boolean {other}")),
    }
}

fn enumeration(kind: Kind, s: &Scalar) -> Result<i32, String> {
    match (kind, s) {
        (Kind::Enum(desc), Scalar::Ident(name)) => desc
            .value_of(name)
            .ok_or_else(|| format!("{name} is not a value of {}", desc.name)),
        _ => int(s),
    }
}

fn bytes(s: &Scalar) -> Result<Vec<u8>, String> {
    match s {
        Scalar::Str(b) => Ok(b.clone()),
        _ => Err("expected a quoted string".to_string()),
    }
}

fn string(s: &Scalar) -> Result<String, String> {
    String::from_utf8(bytes(s)?).map_err(|_| "string is not UTF-8".to_string())
}

fn set_scalar(slot: Slot<'_>, kind: Kind, s: &Scalar) -> Result<(), String> {
    match slot {
        Slot::Double(v) => *v = float(s)?,
        Slot::Float(v) => *v = float(s)?,
        Slot::Int64(v) => *v = int(s)?,
        Slot::Uint64(v) => *v = int(s)?,
        Slot::Int32(v) => *v = int(s)?,
        Slot::Bool(v) => *v = boolean(s)?,
        Slot::Enum(v) => *v = enumeration(kind, s)?,
        Slot::String(v) => *v = string(s)?,
        Slot::Bytes(v) => *v = bytes(s)?,
        Slot::Doubles(v) => v.push(float(s)?),
        Slot::Floats(v) => v.push(float(s)?),
        Slot::Int64s(v) => v.push(int(s)?),
        Slot::Int32s(v) => v.push(int(s)?),
        Slot::Bools(v) => v.push(boolean(s)?),
        Slot::Enums(v) => v.push(enumeration(kind, s)?),
        Slot::Strings(v) => v.push(string(s)?),
        Slot::BytesList(v) => v.push(bytes(s)?),
        Slot::Message(_) | Slot::Messages(_) | Slot::Map(_) => {
            return Err("expected a { block }".to_string());
        }
    }
    Ok(())
}

// PRINTING

struct Printer {
    out: String,
    indent: usize,
    desc: &'static MessageDesc,
}

fn quote(bytes: &[u8]) -> String {
    let mut s = String::from("\"");
    for b in bytes {
        match b {
            b'\n' => s.push_str("\\n"),
            b'\r' => s.push_str("\\r"),
            b'\t' => s.push_str("\\t"),
            b'"' => s.push_str("\\\""),
            b'\'' => s.push_str("\\'"),
            b'\\' => s.push_str("\\\\"),
            0x20..=0x7e => s.push(*b as char),
            _ => s.push_str(&format!("\\{b:03o}")),
        }
    }
    s.push('"');
    s
}

impl Printer {
    fn line(&mut self, content: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(content);
        self.out.push('\n');
    }

    fn nested(&mut self, name: &str, message: &dyn Schema) {
        self.line(&format!("{name} {{"));
        let mut inner =
            Printer { out: String::new(), indent: self.indent + 1, desc: message.schema() };
        message.fields(&mut crate::schema::Emit::new(&mut inner));
        self.out.push_str(&inner.out);
        self.line("}");
    }

    fn scalar(field: &FieldDesc, value: Value<'_>) -> String {
        match value {
            Value::Double(v) => format!("{v:?}"),
            Value::Float(v) => format!("{v:?}"),
            Value::Int64(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Enum(v) => match field.kind {
                Kind::Enum(desc) => desc.name_of(v).map(String::from).unwrap_or(v.to_string()),
                _ => v.to_string(),
            },
            Value::String(v) => quote(v.as_bytes()),
            Value::Bytes(v) => quote(v),
            Value::Message(_) => String::new(),
        }
    }
}

impl Sink for Printer {
    fn field(&mut self, number: u32, value: Value<'_>) {
        let Some(field) = self.desc.field(number) else { return };
        match value {
            Value::Message(m) => self.nested(field.name, m),
            v => {
                let rendered = Self::scalar(field, v);
                self.line(&format!("{}: {}", field.name, rendered))
            }
        }
    }

    fn packed(&mut self, number: u32, values: Packed<'_>) {
        let Some(field) = self.desc.field(number) else { return };
        for ix in 0..values.len() {
            if let Some(v) = values.get(ix) {
                let rendered = Self::scalar(field, v);
                self.line(&format!("{}: {}", field.name, rendered))
            }
        }
    }

    fn entry(&mut self, number: u32, key: &str, value: &dyn Schema) {
        let Some(field) = self.desc.field(number) else { return };
        self.line(&format!("{} {{", field.name));
        self.indent += 1;
        self.line(&format!("key: {}", quote(key.as_bytes())));
        self.nested("value", value);
        self.indent -= 1;
        self.line("}");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_string_escapes() {
        let (rest, s) = string_literal(r#""a\"b\n\101\x41'" tail"#).unwrap();
        assert_eq!(s, b"a\"b\nAA'");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn unterminated_string() {
        assert!(string_literal("\"abc").is_err());
    }

    #[test]
    fn comments_and_separators() {
        let (rest, fields) = document("# head\n a: 1, b { c: 'x' }; # tail\n").unwrap();
        assert_eq!(rest, "");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[0].value, TextValue::Scalar(Scalar::Number("1".into())));
        assert!(matches!(fields[1].value, TextValue::Block(ref b) if b.len() == 1));
    }

    #[test]
    fn lists() {
        let (_, fields) = document("v: [1, -2.5e3, foo]").unwrap();
        assert_eq!(
            fields[0].value,
            TextValue::List(vec![
                TextValue::Scalar(Scalar::Number("1".into())),
                TextValue::Scalar(Scalar::Number("-2.5e3".into())),
                TextValue::Scalar(Scalar::Ident("foo".into())),
            ])
        );
    }

    #[test]
    fn quote_is_parsed_back() {
        let raw = b"q\"\\\x01\xffz";
        let (_, back) = string_literal(&quote(raw)).unwrap();
        assert_eq!(back, raw);
    }
}
