//! Response formatting
//!
//! Every reply line starts with `OK` or `ERR <CODE>` and ends with `\n`.

pub const GREETING: &str = "Welcome to OFS server\n";
pub const SEND_DATA: &str = "SEND_DATA end with <<<EOF>>>\n";
pub const BYE: &str = "OK BYE\n";
pub const SERVER_BUSY: &str = "ERR SERVER_BUSY\n";

/// Terminates the data lines of an upload
pub const END_OF_DATA: &str = "<<<EOF>>>";

pub const NOT_LOGGED_IN: &str = "NOT_LOGGED_IN";
pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
pub const COMMAND_TOO_LONG: &str = "COMMAND_TOO_LONG";
pub const UPLOAD_TOO_LARGE: &str = "UPLOAD_TOO_LARGE";
pub const INVALID_ENCODING: &str = "INVALID_ENCODING";

pub fn ok() -> String {
    "OK\n".to_string()
}

pub fn ok_with(detail: &str) -> String {
    format!("OK {}\n", detail)
}

/// `OK <n>` followed by one line per item.
pub fn ok_lines(lines: &[String]) -> String {
    let mut out = format!("OK {}\n", lines.len());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// `OK <size>` followed by the payload, newline-terminated.
pub fn ok_payload(payload: &[u8]) -> String {
    let mut out = format!("OK {}\n", payload.len());
    out.push_str(&String::from_utf8_lossy(payload));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn err(code: &str) -> String {
    format!("ERR {}\n", code)
}

pub fn usage(text: &str) -> String {
    format!("ERR USAGE: {}\n", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats() {
        assert_eq!(ok(), "OK\n");
        assert_eq!(err("ERROR_NOT_FOUND"), "ERR ERROR_NOT_FOUND\n");
        assert_eq!(usage("LOGIN <u> <p>"), "ERR USAGE: LOGIN <u> <p>\n");
        assert_eq!(
            ok_lines(&["a file".into(), "b directory".into()]),
            "OK 2\na file\nb directory\n"
        );
    }

    #[test]
    fn test_payload_gets_single_trailing_newline() {
        assert_eq!(ok_payload(b"hi\n"), "OK 3\nhi\n");
        assert_eq!(ok_payload(b"hi"), "OK 2\nhi\n");
        assert_eq!(ok_payload(b""), "OK 0\n");
    }
}
