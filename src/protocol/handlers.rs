//! Command handlers module for the OmniFS server.
//!
//! Maps each parsed command onto one engine operation and renders the
//! outcome as a reply line. Nothing here holds state beyond the `Client`.

use log::{debug, info};

use crate::auth::{Identity, SessionState};
use crate::client::Client;
use crate::config::NetworkConfig;
use crate::engine::FilesystemEngine;
use crate::error::FsError;
use crate::error::handlers::report_fs_error;
use crate::protocol::responses;
use crate::protocol::{Command, CommandResult, CommandStatus, PendingUpload};

/// Dispatches a received command to its handler.
///
/// # Arguments
///
/// * `client` - Mutable reference to the client sending the command.
/// * `command` - Reference to the parsed command.
/// * `engine` - The shared filesystem engine.
/// * `config` - Listener limits.
///
/// # Returns
///
/// * `CommandResult` - Status plus the reply to send, if any.
pub fn handle_command(
    client: &mut Client,
    command: &Command,
    engine: &FilesystemEngine,
    config: &NetworkConfig,
) -> CommandResult {
    if command.is_anonymous() {
        return match command {
            Command::Quit => handle_cmd_quit(client, engine),
            Command::Login { username, password } => {
                handle_cmd_login(client, engine, config, username, password)
            }
            Command::Usage(text) => CommandResult::failure("bad arguments", responses::usage(text)),
            _ => CommandResult::failure("unknown", responses::err(responses::UNKNOWN_COMMAND)),
        };
    }

    match client.session_state(engine) {
        SessionState::Authenticated => handle_session_command(client, command, engine, config),
        SessionState::Anonymous => {
            CommandResult::failure("not logged in", responses::err(responses::NOT_LOGGED_IN))
        }
        SessionState::Closed => {
            // Closed from elsewhere, e.g. the account was removed
            let result = finish(client, command.name(), Err(FsError::InvalidSession));
            client.logout();
            result
        }
    }
}

fn handle_session_command(
    client: &mut Client,
    command: &Command,
    engine: &FilesystemEngine,
    config: &NetworkConfig,
) -> CommandResult {
    let Some(handle) = client.session() else {
        return CommandResult::failure("not logged in", responses::err(responses::NOT_LOGGED_IN));
    };

    let outcome = match command {
        Command::Logout => return handle_cmd_logout(client, engine),
        Command::CreateUser {
            username,
            password,
            role,
        } => check_username(config, username)
            .and_then(|_| engine.create_user(handle, username, password, *role))
            .map(|_| responses::ok()),
        Command::DeleteUser(username) => engine
            .remove_user(handle, username)
            .map(|_| responses::ok()),
        Command::SetUserActive { username, active } => engine
            .set_user_active(handle, username, *active)
            .map(|_| responses::ok()),
        Command::ListUsers => engine.list_users(handle).map(|users| {
            let lines: Vec<String> = users.iter().map(user_line).collect();
            responses::ok_lines(&lines)
        }),
        Command::SessionInfo => engine.session_info(handle).map(|session| {
            responses::ok_with(&format!(
                "user={} role={} ops={}",
                session.identity.username, session.identity.role, session.operations_count
            ))
        }),

        Command::DirCreate(path) => engine
            .create_directory(handle, path)
            .map(|_| responses::ok()),
        Command::DirList(path) => engine.list_directory(handle, path).map(|entries| {
            let lines: Vec<String> = entries
                .iter()
                .map(|e| format!("{} {}", e.name, e.kind))
                .collect();
            responses::ok_lines(&lines)
        }),
        Command::DirDelete(path) => engine
            .remove_directory(handle, path)
            .map(|_| responses::ok()),
        Command::DirExists(path) => engine
            .directory_exists(handle, path)
            .and_then(|found| exists_reply(found, path)),

        Command::FileCreate(path) => {
            return await_data(PendingUpload::Create {
                path: path.to_string(),
            });
        }
        Command::FileEdit { path, offset } => {
            return await_data(PendingUpload::Edit {
                path: path.to_string(),
                offset: *offset,
            });
        }
        Command::FileRead(path) => engine
            .read_file(handle, path)
            .map(|data| responses::ok_payload(&data)),
        Command::FileDelete(path) => engine.delete_file(handle, path).map(|_| responses::ok()),
        Command::FileTruncate(path) => engine.truncate_file(handle, path).map(|_| responses::ok()),
        Command::FileExists(path) => engine
            .file_exists(handle, path)
            .and_then(|found| exists_reply(found, path)),
        Command::FileRename { from, to } => engine
            .rename_file(handle, from, to)
            .map(|_| responses::ok()),

        Command::GetMetadata(path) => engine.get_metadata(handle, path).map(|meta| {
            responses::ok_with(&format!(
                "name={} size={} owner={} perms={:o} type={}",
                meta.entry.name,
                meta.entry.size,
                meta.entry.owner,
                meta.entry.permissions,
                meta.kind()
            ))
        }),
        Command::SetPermissions { path, permissions } => engine
            .set_permissions(handle, path, *permissions)
            .map(|_| responses::ok()),
        Command::GetStats => engine.get_stats(handle).map(|stats| {
            responses::ok_with(&format!(
                "files={} dirs={} used={} free={} total={} users={} sessions={}",
                stats.total_files,
                stats.total_directories,
                stats.used_space,
                stats.free_space,
                stats.total_size,
                stats.total_users,
                stats.active_sessions
            ))
        }),

        Command::Quit | Command::Login { .. } | Command::Usage(_) | Command::Unknown => {
            return handle_command(client, command, engine, config);
        }
    };

    finish(client, command.name(), outcome)
}

/// Completes a FILE_CREATE or FILE_EDIT once its data has arrived.
pub fn complete_upload(
    client: &mut Client,
    upload: &PendingUpload,
    data: &[u8],
    engine: &FilesystemEngine,
) -> CommandResult {
    let Some(handle) = client.session() else {
        return CommandResult::failure("not logged in", responses::err(responses::NOT_LOGGED_IN));
    };

    match upload {
        PendingUpload::Create { path } => {
            let outcome = engine
                .create_file(handle, path, data)
                .map(|_| responses::ok());
            finish(client, "FILE_CREATE", outcome)
        }
        PendingUpload::Edit { path, offset } => {
            let outcome = engine
                .edit_file(handle, path, data, *offset)
                .map(|_| responses::ok());
            finish(client, "FILE_EDIT", outcome)
        }
    }
}

fn finish(client: &Client, operation: &str, outcome: Result<String, FsError>) -> CommandResult {
    match outcome {
        Ok(reply) => CommandResult::success(reply),
        Err(e) => {
            let code = report_fs_error(&client.label(), operation, &e);
            CommandResult::failure(&e.to_string(), responses::err(code))
        }
    }
}

fn await_data(upload: PendingUpload) -> CommandResult {
    CommandResult {
        status: CommandStatus::AwaitData(upload),
        message: Some(responses::SEND_DATA.to_string()),
    }
}

fn exists_reply(found: bool, path: &str) -> Result<String, FsError> {
    if found {
        Ok(responses::ok())
    } else {
        Err(FsError::NotFound(path.to_string()))
    }
}

fn user_line(user: &Identity) -> String {
    let active = u8::from(user.is_active);
    format!("{} role={} active={}", user.username, user.role, active)
}

fn check_username(config: &NetworkConfig, username: &str) -> Result<(), FsError> {
    if username.len() > config.max_username_length {
        return Err(FsError::InvalidOperation(format!(
            "username longer than {} bytes",
            config.max_username_length
        )));
    }
    Ok(())
}

/// Handles LOGIN. A failed attempt leaves any existing session untouched.
fn handle_cmd_login(
    client: &mut Client,
    engine: &FilesystemEngine,
    config: &NetworkConfig,
    username: &str,
    password: &str,
) -> CommandResult {
    let outcome = check_username(config, username)
        .and_then(|_| engine.login(username, password));

    match outcome {
        Ok(handle) => {
            if let Some(previous) = client.login(handle, username) {
                if let Err(e) = engine.logout(previous) {
                    debug!("Previous session {} was already closed: {}", previous, e);
                }
            }
            info!("Client {} authenticated", client.label());
            CommandResult::success(responses::ok_with("SESSION"))
        }
        Err(e) => finish(client, "LOGIN", Err(e)),
    }
}

/// Handles LOGOUT: closes the session but keeps the connection.
fn handle_cmd_logout(client: &mut Client, engine: &FilesystemEngine) -> CommandResult {
    let label = client.label();
    match client.logout() {
        Some(handle) => {
            let outcome = engine.logout(handle).map(|_| {
                info!("Client {} logged out", label);
                responses::ok()
            });
            finish(client, "LOGOUT", outcome)
        }
        None => CommandResult::failure("not logged in", responses::err(responses::NOT_LOGGED_IN)),
    }
}

/// Handles QUIT: logs out the client and signals connection close.
fn handle_cmd_quit(client: &mut Client, engine: &FilesystemEngine) -> CommandResult {
    if let Some(handle) = client.logout() {
        if let Err(e) = engine.logout(handle) {
            debug!("Session {} was already closed: {}", handle, e);
        }
    }

    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(responses::BYE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::protocol::parse_command;
    use crate::storage::StoreHeader;
    use std::net::SocketAddr;

    struct Harness {
        engine: FilesystemEngine,
        config: NetworkConfig,
    }

    impl Harness {
        fn new() -> Self {
            let header = StoreHeader::from_config(&StorageConfig::default()).unwrap();
            Self {
                engine: FilesystemEngine::from_header(header).unwrap(),
                config: NetworkConfig::default(),
            }
        }

        fn client(port: u16) -> Client {
            Client::new(SocketAddr::from(([127, 0, 0, 1], port)))
        }

        fn dispatch(&self, client: &mut Client, command: &Command) -> CommandResult {
            handle_command(client, command, &self.engine, &self.config)
        }

        fn run(&self, client: &mut Client, line: &str) -> String {
            let command = parse_command(line);
            self.dispatch(client, &command).message.unwrap_or_default()
        }
    }

    #[test]
    fn test_requires_login() {
        let h = Harness::new();
        let mut c = Harness::client(4000);
        assert_eq!(h.run(&mut c, "GET_STATS"), "ERR NOT_LOGGED_IN\n");
        assert_eq!(h.run(&mut c, "LOGOUT"), "ERR NOT_LOGGED_IN\n");
        assert_eq!(h.run(&mut c, "BOGUS"), "ERR UNKNOWN_COMMAND\n");
    }

    #[test]
    fn test_login_and_directory_commands() {
        let h = Harness::new();
        let mut c = Harness::client(4000);
        assert_eq!(
            h.run(&mut c, "LOGIN root wrong"),
            "ERR ERROR_PERMISSION_DENIED\n"
        );
        assert_eq!(h.run(&mut c, "LOGIN root root"), "OK SESSION\n");

        assert_eq!(h.run(&mut c, "MKDIR /docs"), "OK\n");
        assert_eq!(h.run(&mut c, "MKDIR /docs"), "ERR ERROR_FILE_EXISTS\n");
        assert_eq!(h.run(&mut c, "DIR_EXISTS /docs"), "OK\n");
        assert_eq!(h.run(&mut c, "DIR_EXISTS /nope"), "ERR ERROR_NOT_FOUND\n");
        assert_eq!(h.run(&mut c, "LS /"), "OK 1\ndocs directory\n");
        assert_eq!(
            h.run(&mut c, "GET_METADATA /docs"),
            "OK name=docs size=0 owner=root perms=755 type=directory\n"
        );
    }

    #[test]
    fn test_upload_flow() {
        let h = Harness::new();
        let mut c = Harness::client(4000);
        h.run(&mut c, "LOGIN root root");

        let result = h.dispatch(&mut c, &parse_command("CREATE /a.txt"));
        let CommandStatus::AwaitData(upload) = result.status else {
            panic!("expected a data phase");
        };
        let done = complete_upload(&mut c, &upload, b"hello world\n", &h.engine);
        assert_eq!(done.message.as_deref(), Some("OK\n"));
        assert_eq!(h.run(&mut c, "READ /a.txt"), "OK 12\nhello world\n");

        let edit = PendingUpload::Edit {
            path: "/a.txt".into(),
            offset: 0,
        };
        complete_upload(&mut c, &edit, b"HELLO", &h.engine);
        assert_eq!(h.run(&mut c, "READ /a.txt"), "OK 12\nHELLO world\n");
    }

    #[test]
    fn test_logout_keeps_connection_and_quit_closes() {
        let h = Harness::new();
        let mut c = Harness::client(4000);
        h.run(&mut c, "LOGIN root root");
        let handle = c.session().unwrap();
        assert_eq!(c.username(), Some("root"));

        let result = h.dispatch(&mut c, &Command::Logout);
        assert_eq!(result.status, CommandStatus::Success);
        assert_eq!(c.session_state(&h.engine), SessionState::Anonymous);
        assert_eq!(c.username(), None);
        assert_eq!(h.engine.session_state(handle), SessionState::Closed);

        let result = h.dispatch(&mut c, &Command::Quit);
        assert_eq!(result.status, CommandStatus::CloseConnection);
        assert_eq!(result.message.as_deref(), Some("OK BYE\n"));
    }

    #[test]
    fn test_user_administration() {
        let h = Harness::new();
        let mut c = Harness::client(4000);
        h.run(&mut c, "LOGIN root root");
        assert_eq!(h.run(&mut c, "CREATE_USER alice pw 0"), "OK\n");
        assert_eq!(
            h.run(&mut c, "LIST_USERS"),
            "OK 2\nalice role=normal active=1\nroot role=admin active=1\n"
        );

        let name = "x".repeat(h.config.max_username_length + 1);
        let line = format!("CREATE_USER {} pw 0", name);
        assert_eq!(h.run(&mut c, &line), "ERR ERROR_INVALID_OPERATION\n");

        let info = h.run(&mut c, "GET_SESSION_INFO");
        assert!(info.starts_with("OK user=root role=admin"));
    }

    #[test]
    fn test_session_closed_elsewhere_detaches_client() {
        let h = Harness::new();
        let mut admin = Harness::client(4000);
        h.run(&mut admin, "LOGIN root root");
        h.run(&mut admin, "CREATE_USER alice pw 0");

        let mut alice = Harness::client(4001);
        assert_eq!(h.run(&mut alice, "LOGIN alice pw"), "OK SESSION\n");
        assert_eq!(h.run(&mut admin, "DELETE_USER alice"), "OK\n");

        assert_eq!(h.run(&mut alice, "LS /"), "ERR ERROR_INVALID_SESSION\n");
        assert_eq!(alice.session(), None);
        assert_eq!(h.run(&mut alice, "LS /"), "ERR NOT_LOGGED_IN\n");
    }
}
