//! Flat field layout of an account hash.
//!
//! Both directions walk the same [`FIELDS`] table, so a field cannot be written
//! without also being read back. Optional text is written as an empty string
//! and read back as `None`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::entities::accounts::Account;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid value {value:?} for field {field}")]
    InvalidField { field: &'static str, value: String },
}

struct BadValue;

struct Field {
    name: &'static str,
    encode: fn(&Account) -> String,
    decode: fn(&mut Account, &str) -> Result<(), BadValue>,
}

macro_rules! text_field {
    ($name:literal, $attr:ident) => {
        Field {
            name: $name,
            encode: |account| account.$attr.clone().unwrap_or_default(),
            decode: |account, value| {
                account.$attr = text(value);
                Ok(())
            },
        }
    };
}

macro_rules! flag_field {
    ($name:literal, $attr:ident) => {
        Field {
            name: $name,
            encode: |account| flag(account.$attr).to_string(),
            decode: |account, value| {
                account.$attr = parse_flag(value)?;
                Ok(())
            },
        }
    };
}

static FIELDS: &[Field] = &[
    Field {
        name: "Id",
        encode: |account| account.id.clone(),
        decode: |account, value| {
            account.id = value.to_string();
            Ok(())
        },
    },
    text_field!("UserName", username),
    text_field!("NormalizedUserName", normalized_username),
    text_field!("Email", email),
    text_field!("NormalizedEmail", normalized_email),
    flag_field!("EmailConfirmed", email_confirmed),
    text_field!("PasswordHash", password_hash),
    text_field!("SecurityStamp", security_stamp),
    text_field!("ConcurrencyStamp", concurrency_stamp),
    text_field!("PhoneNumber", phone_number),
    flag_field!("PhoneNumberConfirmed", phone_number_confirmed),
    flag_field!("TwoFactorEnabled", two_factor_enabled),
    Field {
        name: "LockoutEnd",
        encode: |account| account.lockout_end.map(timestamp).unwrap_or_default(),
        decode: |account, value| {
            account.lockout_end = if value.is_empty() {
                None
            } else {
                Some(parse_timestamp(value)?)
            };
            Ok(())
        },
    },
    flag_field!("LockoutEnabled", lockout_enabled),
    Field {
        name: "AccessFailedCount",
        encode: |account| account.access_failed_count.to_string(),
        decode: |account, value| {
            account.access_failed_count = value.parse().map_err(|_| BadValue)?;
            Ok(())
        },
    },
    text_field!("FirstName", first_name),
    text_field!("LastName", last_name),
    Field {
        name: "CreatedAt",
        encode: |account| timestamp(account.created_at),
        decode: |account, value| {
            if !value.is_empty() {
                account.created_at = parse_timestamp(value)?;
            }
            Ok(())
        },
    },
];

fn text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_flag(value: &str) -> Result<bool, BadValue> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ if value.eq_ignore_ascii_case("true") => Ok(true),
        _ if value.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(BadValue),
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, BadValue> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| BadValue)
}

/// Every field of `account`, in table order.
pub fn encode(account: &Account) -> Vec<(&'static str, String)> {
    FIELDS
        .iter()
        .map(|field| (field.name, (field.encode)(account)))
        .collect()
}

/// Rebuilds an account from a stored hash. An empty hash means the record does
/// not exist and yields `Ok(None)`; unknown fields are skipped.
pub fn decode(fields: &[(String, String)]) -> Result<Option<Account>, CodecError> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut account = Account::default();
    for (name, value) in fields {
        let Some(field) = FIELDS.iter().find(|field| field.name == name.as_str()) else {
            continue;
        };
        (field.decode)(&mut account, value).map_err(|_| CodecError::InvalidField {
            field: field.name,
            value: value.clone(),
        })?;
    }
    Ok(Some(account))
}

fn stored<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(stored, _)| stored.as_str() == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

/// The indexed email of a stored hash, read without decoding the other fields.
pub fn stored_index_email(fields: &[(String, String)]) -> Option<&str> {
    stored(fields, "NormalizedEmail")
}

/// The `CreatedAt` of a stored hash, read without decoding the other fields.
pub fn stored_created_at(
    fields: &[(String, String)],
) -> Result<Option<DateTime<Utc>>, CodecError> {
    let Some(value) = stored(fields, "CreatedAt") else {
        return Ok(None);
    };
    parse_timestamp(value)
        .map(Some)
        .map_err(|_| CodecError::InvalidField {
            field: "CreatedAt",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn owned(fields: Vec<(&'static str, String)>) -> Vec<(String, String)> {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    fn full_account() -> Account {
        Account {
            id: "6f1c1f8e-3e0b-4a52-9a57-0c3c8f1d2b11".to_string(),
            username: Some("alice".to_string()),
            normalized_username: Some("ALICE".to_string()),
            email: Some("a@x.com".to_string()),
            normalized_email: Some("A@X.COM".to_string()),
            email_confirmed: true,
            password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
            security_stamp: Some("STAMP".to_string()),
            concurrency_stamp: Some("c0ffee".to_string()),
            phone_number: Some("+15550100".to_string()),
            phone_number_confirmed: false,
            two_factor_enabled: true,
            lockout_end: Some(Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap()),
            lockout_enabled: true,
            access_failed_count: 3,
            first_name: Some("Alice".to_string()),
            last_name: Some("Liddell".to_string()),
            created_at: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
        }
    }

    #[test]
    fn decode_reverses_encode() {
        let account = full_account();
        let decoded = decode(&owned(encode(&account))).unwrap();
        assert_eq!(decoded, Some(account));
    }

    #[test]
    fn encode_writes_every_field_in_order() {
        let names: Vec<&str> = encode(&Account::default())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Id",
                "UserName",
                "NormalizedUserName",
                "Email",
                "NormalizedEmail",
                "EmailConfirmed",
                "PasswordHash",
                "SecurityStamp",
                "ConcurrencyStamp",
                "PhoneNumber",
                "PhoneNumberConfirmed",
                "TwoFactorEnabled",
                "LockoutEnd",
                "LockoutEnabled",
                "AccessFailedCount",
                "FirstName",
                "LastName",
                "CreatedAt",
            ]
        );
    }

    #[test]
    fn unset_text_is_written_empty_and_read_back_unset() {
        let account = Account {
            id: "id-1".to_string(),
            username: Some(String::new()),
            ..Default::default()
        };
        let encoded = encode(&account);
        assert!(encoded.contains(&("UserName", String::new())));
        assert!(encoded.contains(&("LockoutEnd", String::new())));

        let decoded = decode(&owned(encoded)).unwrap().unwrap();
        assert_eq!(decoded.username, None);
        assert_eq!(decoded.lockout_end, None);
        assert_eq!(decoded.email, None);
    }

    #[test]
    fn empty_hash_is_absent_not_an_error() {
        assert_eq!(decode(&[]), Ok(None));
    }

    #[test]
    fn flags_accept_textual_booleans() {
        let fields = vec![
            ("Id".to_string(), "id-1".to_string()),
            ("EmailConfirmed".to_string(), "True".to_string()),
            ("LockoutEnabled".to_string(), "false".to_string()),
            ("TwoFactorEnabled".to_string(), "1".to_string()),
        ];
        let account = decode(&fields).unwrap().unwrap();
        assert!(account.email_confirmed);
        assert!(!account.lockout_enabled);
        assert!(account.two_factor_enabled);
    }

    #[test]
    fn malformed_values_name_the_field() {
        let fields = vec![("AccessFailedCount".to_string(), "-1".to_string())];
        assert_eq!(
            decode(&fields),
            Err(CodecError::InvalidField {
                field: "AccessFailedCount",
                value: "-1".to_string(),
            })
        );

        let fields = vec![("CreatedAt".to_string(), "yesterday".to_string())];
        assert!(matches!(
            decode(&fields),
            Err(CodecError::InvalidField { field: "CreatedAt", .. })
        ));
    }

    #[test]
    fn offsets_are_converted_to_utc_and_unknown_fields_skipped() {
        let fields = vec![
            ("Id".to_string(), "id-1".to_string()),
            ("LockoutEnd".to_string(), "2030-05-01T14:00:00+02:00".to_string()),
            ("Legacy".to_string(), "ignored".to_string()),
        ];
        let account = decode(&fields).unwrap().unwrap();
        assert_eq!(
            account.lockout_end,
            Some(Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn stored_fields_are_read_past_a_malformed_neighbour() {
        let fields = vec![
            ("NormalizedEmail".to_string(), "B@X.COM".to_string()),
            ("LockoutEnd".to_string(), "5/1/2030 12:00:00 PM +00:00".to_string()),
            ("CreatedAt".to_string(), "2023-11-14T22:13:20Z".to_string()),
        ];
        assert!(decode(&fields).is_err());
        assert_eq!(stored_index_email(&fields), Some("B@X.COM"));
        assert_eq!(
            stored_created_at(&fields),
            Ok(Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
        );

        let blank = vec![("NormalizedEmail".to_string(), String::new())];
        assert_eq!(stored_index_email(&blank), None);
        assert_eq!(stored_created_at(&blank), Ok(None));
    }
}
