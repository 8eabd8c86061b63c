//! Metadata property encoding shared by mechanism commands.
//!
//! INITIATE and READY bodies carry zero or more properties, each
//! encoded as:
//! ```text
//! ┌──────────┬───────────┬───────────┬─────────────┐
//! │ Name len │ Name      │ Value len │ Value       │
//! │ 1 byte   │ len bytes │ u32 BE    │ len bytes   │
//! └──────────┴───────────┴───────────┴─────────────┘
//! ```

use crate::error::{Result, ZmtpError};

/// Append one property to a command body.
///
/// Property names are at most 255 bytes; longer names are a programmer
/// error.
pub fn append_property(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    debug_assert!(!name.is_empty() && name.len() < 256);
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value);
}

/// Build a command body: the length-prefixed name followed by the
/// given properties.
pub fn encode_command(name_prefix: &[u8], properties: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = name_prefix.to_vec();
    for (name, value) in properties {
        append_property(&mut body, name, value);
    }
    body
}

/// Parse a property list, as found after a command name prefix.
///
/// Any truncation, a zero-length name, or a non-UTF-8 name is
/// [`ZmtpError::InvalidMetadata`].
pub fn parse_properties(mut data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut properties = Vec::new();

    while !data.is_empty() {
        let name_len = data[0] as usize;
        if name_len == 0 || data.len() < 1 + name_len + 4 {
            return Err(ZmtpError::InvalidMetadata);
        }
        let name = std::str::from_utf8(&data[1..1 + name_len])
            .map_err(|_| ZmtpError::InvalidMetadata)?
            .to_string();

        let mut raw_len = [0u8; 4];
        raw_len.copy_from_slice(&data[1 + name_len..1 + name_len + 4]);
        let value_len = u32::from_be_bytes(raw_len) as usize;

        let rest = &data[1 + name_len + 4..];
        if rest.len() < value_len {
            return Err(ZmtpError::InvalidMetadata);
        }
        properties.push((name, rest[..value_len].to_vec()));
        data = &rest[value_len..];
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_property() {
        let mut body = Vec::new();
        append_property(&mut body, "Socket-Type", b"DEALER");

        assert_eq!(body[0], 11);
        assert_eq!(&body[1..12], b"Socket-Type");
        assert_eq!(&body[12..16], &6u32.to_be_bytes());
        assert_eq!(&body[16..], b"DEALER");

        let props = parse_properties(&body).unwrap();
        assert_eq!(props, vec![("Socket-Type".to_string(), b"DEALER".to_vec())]);
    }

    #[test]
    fn test_multiple_properties_preserve_order() {
        let mut body = Vec::new();
        append_property(&mut body, "Socket-Type", b"ROUTER");
        append_property(&mut body, "Identity", b"worker-7");

        let props = parse_properties(&body).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].0, "Socket-Type");
        assert_eq!(props[1].0, "Identity");
        assert_eq!(props[1].1, b"worker-7");
    }

    #[test]
    fn test_empty_value() {
        let mut body = Vec::new();
        append_property(&mut body, "Resource", b"");

        let props = parse_properties(&body).unwrap();
        assert_eq!(props, vec![("Resource".to_string(), Vec::new())]);
    }

    #[test]
    fn test_encode_command() {
        let body = encode_command(b"\x05READY", &[("Socket-Type", b"ROUTER")]);
        assert_eq!(&body[..6], b"\x05READY");

        let props = parse_properties(&body[6..]).unwrap();
        assert_eq!(props, vec![("Socket-Type".to_string(), b"ROUTER".to_vec())]);
    }

    #[test]
    fn test_empty_body_is_no_properties() {
        assert!(parse_properties(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_name_rejected() {
        // Claims a 5-byte name but only 2 bytes follow.
        let body = [5, b'a', b'b'];
        assert!(matches!(
            parse_properties(&body),
            Err(ZmtpError::InvalidMetadata)
        ));
    }

    #[test]
    fn test_zero_length_name_rejected() {
        let body = [0, 0, 0, 0, 0];
        assert!(matches!(
            parse_properties(&body),
            Err(ZmtpError::InvalidMetadata)
        ));
    }

    #[test]
    fn test_truncated_value_rejected() {
        let mut body = Vec::new();
        append_property(&mut body, "Identity", b"worker-7");
        body.truncate(body.len() - 3);

        assert!(matches!(
            parse_properties(&body),
            Err(ZmtpError::InvalidMetadata)
        ));
    }
}
