//! Module `commands`
//!
//! Defines the line command grammar and the data structures used to
//! represent commands, their status, and results.

use crate::auth::UserRole;

/// A command parsed from one client line.
///
/// Arguments are whitespace separated, so paths and credentials cannot
/// contain spaces.
#[derive(Debug, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Quit,
    CreateUser {
        username: String,
        password: String,
        role: UserRole,
    },
    DeleteUser(String),
    SetUserActive { username: String, active: bool },
    ListUsers,
    SessionInfo,
    DirCreate(String),
    DirList(String),
    DirDelete(String),
    DirExists(String),
    FileCreate(String),
    FileRead(String),
    FileEdit { path: String, offset: u64 },
    FileDelete(String),
    FileTruncate(String),
    FileExists(String),
    FileRename { from: String, to: String },
    GetMetadata(String),
    SetPermissions { path: String, permissions: u32 },
    GetStats,
    /// Known command with bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown,
}

impl Command {
    /// Canonical command name, safe to log (never includes credentials).
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "LOGIN",
            Command::Logout => "LOGOUT",
            Command::Quit => "QUIT",
            Command::CreateUser { .. } => "CREATE_USER",
            Command::DeleteUser(_) => "DELETE_USER",
            Command::SetUserActive { .. } => "SET_USER_ACTIVE",
            Command::ListUsers => "LIST_USERS",
            Command::SessionInfo => "GET_SESSION_INFO",
            Command::DirCreate(_) => "DIR_CREATE",
            Command::DirList(_) => "DIR_LIST",
            Command::DirDelete(_) => "DIR_DELETE",
            Command::DirExists(_) => "DIR_EXISTS",
            Command::FileCreate(_) => "FILE_CREATE",
            Command::FileRead(_) => "FILE_READ",
            Command::FileEdit { .. } => "FILE_EDIT",
            Command::FileDelete(_) => "FILE_DELETE",
            Command::FileTruncate(_) => "FILE_TRUNCATE",
            Command::FileExists(_) => "FILE_EXISTS",
            Command::FileRename { .. } => "FILE_RENAME",
            Command::GetMetadata(_) => "GET_METADATA",
            Command::SetPermissions { .. } => "SET_PERMISSIONS",
            Command::GetStats => "GET_STATS",
            Command::Usage(_) => "USAGE",
            Command::Unknown => "UNKNOWN",
        }
    }

    /// Commands accepted before a session exists.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            Command::Login { .. } | Command::Quit | Command::Usage(_) | Command::Unknown
        )
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
    /// The client must send data lines before the command completes.
    AwaitData(PendingUpload),
}

/// A FILE_CREATE or FILE_EDIT waiting for its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingUpload {
    Create { path: String },
    Edit { path: String, offset: u64 },
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message),
        }
    }

    pub fn failure(reason: &str, message: String) -> Self {
        Self {
            status: CommandStatus::Failure(reason.to_string()),
            message: Some(message),
        }
    }
}

/// Parses a raw command line received from a client into a `Command`.
///
/// Command names are case-insensitive. A known command with the wrong
/// number or shape of arguments yields `Command::Usage`.
pub fn parse_command(raw: &str) -> Command {
    let mut parts = raw.split_whitespace();
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let args: Vec<&str> = parts.collect();

    match (cmd.as_str(), args.as_slice()) {
        ("LOGIN", [user, pass]) => Command::Login {
            username: user.to_string(),
            password: pass.to_string(),
        },
        ("LOGIN", _) => Command::Usage("LOGIN <username> <password>"),
        ("LOGOUT", []) => Command::Logout,
        ("QUIT", []) => Command::Quit,

        ("CREATE_USER", [user, pass, role]) => match UserRole::parse(role) {
            Some(role) => Command::CreateUser {
                username: user.to_string(),
                password: pass.to_string(),
                role,
            },
            None => Command::Usage("CREATE_USER <username> <password> <0|1|normal|admin>"),
        },
        ("CREATE_USER", _) => {
            Command::Usage("CREATE_USER <username> <password> <0|1|normal|admin>")
        }
        ("DELETE_USER", [user]) => Command::DeleteUser(user.to_string()),
        ("DELETE_USER", _) => Command::Usage("DELETE_USER <username>"),
        ("SET_USER_ACTIVE", [user, flag]) => match *flag {
            "1" => Command::SetUserActive {
                username: user.to_string(),
                active: true,
            },
            "0" => Command::SetUserActive {
                username: user.to_string(),
                active: false,
            },
            _ => Command::Usage("SET_USER_ACTIVE <username> <0|1>"),
        },
        ("SET_USER_ACTIVE", _) => Command::Usage("SET_USER_ACTIVE <username> <0|1>"),
        ("LIST_USERS", []) => Command::ListUsers,
        ("GET_SESSION_INFO", []) => Command::SessionInfo,

        ("DIR_CREATE" | "MKDIR", [path]) => Command::DirCreate(path.to_string()),
        ("DIR_CREATE" | "MKDIR", _) => Command::Usage("DIR_CREATE <path>"),
        ("DIR_LIST" | "LS", [path]) => Command::DirList(path.to_string()),
        ("DIR_LIST" | "LS", _) => Command::Usage("DIR_LIST <path>"),
        ("DIR_DELETE" | "RMDIR", [path]) => Command::DirDelete(path.to_string()),
        ("DIR_DELETE" | "RMDIR", _) => Command::Usage("DIR_DELETE <path>"),
        ("DIR_EXISTS" | "EXISTS_DIR", [path]) => Command::DirExists(path.to_string()),
        ("DIR_EXISTS" | "EXISTS_DIR", _) => Command::Usage("DIR_EXISTS <path>"),

        ("FILE_CREATE" | "CREATE", [path]) => Command::FileCreate(path.to_string()),
        ("FILE_CREATE" | "CREATE", _) => Command::Usage("FILE_CREATE <path>"),
        ("FILE_READ" | "READ", [path]) => Command::FileRead(path.to_string()),
        ("FILE_READ" | "READ", _) => Command::Usage("FILE_READ <path>"),
        ("FILE_EDIT" | "EDIT", [path, offset]) => match offset.parse::<u64>() {
            Ok(offset) => Command::FileEdit {
                path: path.to_string(),
                offset,
            },
            Err(_) => Command::Usage("FILE_EDIT <path> <offset>"),
        },
        ("FILE_EDIT" | "EDIT", _) => Command::Usage("FILE_EDIT <path> <offset>"),
        ("FILE_DELETE" | "DELETE", [path]) => Command::FileDelete(path.to_string()),
        ("FILE_DELETE" | "DELETE", _) => Command::Usage("FILE_DELETE <path>"),
        ("FILE_TRUNCATE" | "TRUNCATE", [path]) => Command::FileTruncate(path.to_string()),
        ("FILE_TRUNCATE" | "TRUNCATE", _) => Command::Usage("FILE_TRUNCATE <path>"),
        ("FILE_EXISTS" | "EXISTS_FILE", [path]) => Command::FileExists(path.to_string()),
        ("FILE_EXISTS" | "EXISTS_FILE", _) => Command::Usage("FILE_EXISTS <path>"),
        ("FILE_RENAME" | "RENAME", [from, to]) => Command::FileRename {
            from: from.to_string(),
            to: to.to_string(),
        },
        ("FILE_RENAME" | "RENAME", _) => Command::Usage("FILE_RENAME <old_path> <new_path>"),

        ("GET_METADATA", [path]) => Command::GetMetadata(path.to_string()),
        ("GET_METADATA", _) => Command::Usage("GET_METADATA <path>"),
        ("SET_PERMISSIONS", [path, mode]) => match u32::from_str_radix(mode, 8) {
            Ok(permissions) => Command::SetPermissions {
                path: path.to_string(),
                permissions,
            },
            Err(_) => Command::Usage("SET_PERMISSIONS <path> <octal_mode>"),
        },
        ("SET_PERMISSIONS", _) => Command::Usage("SET_PERMISSIONS <path> <octal_mode>"),
        ("GET_STATS", []) => Command::GetStats,

        _ => Command::Unknown,
    }
}
