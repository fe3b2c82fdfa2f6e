//! Conversion between parsed arguments and ABI tokens
//!
//! [`ArgValue`] supplies the structure (lists, tuples, records). Every scalar
//! leaf is read by ethabi's `LenientTokenizer`.

use super::literal::ArgValue;
use crate::account::checksummed;
use crate::error::{DymkaError, DymkaResult};

use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Param, ParamType, Token};
use ethers::types::{I256, U256};
use serde_json::{json, Value};

/// Parse an unsigned quantity given in decimal, `0x` hex or as a unit
/// amount such as `2 gwei`
pub fn parse_u256(text: &str) -> Result<U256, String> {
    let text = text.trim();
    LenientTokenizer::tokenize_uint(&quantity_text(text)?)
        .map(|word| U256::from_big_endian(&word))
        .map_err(|e| format!("invalid unsigned integer {}: {}", text, e))
}

/// `0x` quantities are widened to the 32 byte word the tokenizer reads as hex
fn quantity_text(text: &str) -> Result<String, String> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() && digits.len() <= 64 => {
            Ok(format!("{:0>64}", digits))
        }
        Some(_) => Err(format!("invalid hex quantity {}", text)),
        None => Ok(text.to_string()),
    }
}

fn mismatch(kind: &ParamType, value: &ArgValue) -> DymkaError {
    DymkaError::ArgumentParse(format!("cannot use {:?} as {}", value, kind))
}

/// Hand one scalar to the tokenizer
fn tokenize_text(kind: &ParamType, text: &str) -> DymkaResult<Token> {
    let input = match kind {
        ParamType::Uint(_) | ParamType::Int(_) => {
            quantity_text(text.trim()).map_err(DymkaError::ArgumentParse)?
        }
        ParamType::String => text.to_string(),
        _ => text.trim().to_string(),
    };
    LenientTokenizer::tokenize(kind, &input)
        .map_err(|e| DymkaError::ArgumentParse(format!("cannot use {} as {}: {}", text, kind, e)))
}

/// The tokenizer does not know about `uint8`, `int16` and friends
fn check_width(kind: &ParamType, token: &Token) -> DymkaResult<()> {
    let fits = match (kind, token) {
        (ParamType::Uint(bits), Token::Uint(value)) => value.bits() <= *bits,
        (ParamType::Int(bits), Token::Int(raw)) => {
            let value = I256::from_raw(*raw);
            let limit = U256::one() << bits.saturating_sub(1);
            if value.is_negative() {
                value.unsigned_abs() <= limit
            } else {
                value.unsigned_abs() < limit
            }
        }
        _ => true,
    };

    if fits {
        Ok(())
    } else {
        Err(DymkaError::ArgumentParse(format!(
            "{} does not fit in {}",
            token_to_json(token),
            kind
        )))
    }
}

fn tokenize_each(kind: &ParamType, items: &[ArgValue]) -> DymkaResult<Vec<Token>> {
    items.iter().map(|item| tokenize(kind, item)).collect()
}

fn tokenize_tuple<'v>(
    components: &[ParamType],
    items: impl ExactSizeIterator<Item = &'v ArgValue>,
) -> DymkaResult<Token> {
    if items.len() != components.len() {
        return Err(DymkaError::ArgumentParse(format!(
            "expected {} tuple components, got {}",
            components.len(),
            items.len()
        )));
    }
    components
        .iter()
        .zip(items)
        .map(|(component, item)| tokenize(component, item))
        .collect::<DymkaResult<Vec<_>>>()
        .map(Token::Tuple)
}

/// Coerce one argument into a token of the given ABI type
pub fn tokenize(kind: &ParamType, value: &ArgValue) -> DymkaResult<Token> {
    let token = match (kind, value) {
        (ParamType::Array(inner), ArgValue::List(items)) => {
            Token::Array(tokenize_each(inner, items)?)
        }
        (ParamType::FixedArray(inner, size), ArgValue::List(items)) => {
            if items.len() != *size {
                return Err(mismatch(kind, value));
            }
            Token::FixedArray(tokenize_each(inner, items)?)
        }
        (ParamType::Tuple(components), ArgValue::List(items)) => {
            tokenize_tuple(components, items.iter())?
        }
        (ParamType::Tuple(components), ArgValue::Record(fields)) => {
            tokenize_tuple(components, fields.iter().map(|(_, v)| v))?
        }
        (_, ArgValue::Bool(b)) => tokenize_text(kind, &b.to_string())?,
        (_, ArgValue::Number(text)) | (_, ArgValue::Str(text)) => tokenize_text(kind, text)?,
        _ => return Err(mismatch(kind, value)),
    };

    check_width(kind, &token)?;
    Ok(token)
}

/// Coerce a full argument list against the declared inputs
pub fn tokenize_all(inputs: &[Param], args: &[ArgValue]) -> DymkaResult<Vec<Token>> {
    if inputs.len() != args.len() {
        return Err(DymkaError::ArgumentParse(format!(
            "expected {} arguments, got {}",
            inputs.len(),
            args.len()
        )));
    }

    inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            tokenize(&param.kind, arg).map_err(|e| match e {
                DymkaError::ArgumentParse(message) if !param.name.is_empty() => {
                    DymkaError::ArgumentParse(format!("{}: {}", param.name, message))
                }
                other => other,
            })
        })
        .collect()
}

/// Render a decoded token for display
pub fn token_to_json(token: &Token) -> Value {
    match token {
        Token::Address(address) => json!(checksummed(address)),
        Token::Uint(number) => json!(number.to_string()),
        Token::Int(raw) => json!(I256::from_raw(*raw).to_string()),
        Token::Bool(b) => json!(b),
        Token::String(s) => json!(s),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => {
            json!(format!("0x{}", hex::encode(bytes)))
        }
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
            Value::Array(items.iter().map(token_to_json).collect())
        }
    }
}

/// Render call outputs the way a single value or a list would read
pub fn outputs_to_json(tokens: &[Token]) -> Value {
    match tokens {
        [] => Value::Null,
        [single] => token_to_json(single),
        many => Value::Array(many.iter().map(token_to_json).collect()),
    }
}
