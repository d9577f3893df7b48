//! [`Session`] implementation over a plain FTP control connection.

mod listing;

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use suppaftp::{FtpError, FtpStream, Mode, Status};

use crate::{Capability, RemoteEntry, Session, SessionError, SessionResult};

use self::listing::{
    format_timestamp, join, parse_features, parse_listing, parse_machine_listing, parse_object_info,
};

/// Data connection direction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransferMode {
    /// The client opens data connections (`PASV`).
    #[default]
    Passive,
    /// The server opens data connections (`PORT`).
    Active,
}

/// Everything needed to open and re-open an FTP session.
#[derive(Clone)]
pub struct FtpSettings {
    host: String,
    port: u16,
    username: String,
    password: String,
    mode: TransferMode,
    timeout: Duration,
}

impl FtpSettings {
    /// Port used when the target URL names none.
    pub const DEFAULT_PORT: u16 = 21;

    /// Per-call timeout used when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates settings for `host` with the default port, passive mode and
    /// timeout.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            mode: TransferMode::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the control port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the data connection mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the connect and read/write timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the control port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the data connection mode.
    #[must_use]
    pub const fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn socket_address(&self) -> SessionResult<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                SessionError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not resolve to an address", self.host),
                ))
            })
    }
}

impl fmt::Debug for FtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An FTP session backed by [`suppaftp`].
///
/// The session remembers the directory it last entered so listings can
/// report absolute paths, and caches the server's `FEAT` reply for the life
/// of the connection.
pub struct FtpSession {
    settings: Arc<FtpSettings>,
    stream: Option<FtpStream>,
    features: Option<HashSet<String>>,
    directory: Option<String>,
}

impl FtpSession {
    /// Creates an unconnected session.
    #[must_use]
    pub const fn new(settings: Arc<FtpSettings>) -> Self {
        Self {
            settings,
            stream: None,
            features: None,
            directory: None,
        }
    }

    /// Creates a session and connects it.
    ///
    /// # Errors
    ///
    /// Returns the connect or login failure.
    pub fn open(settings: Arc<FtpSettings>) -> SessionResult<Self> {
        let mut session = Self::new(settings);
        session.connect()?;
        Ok(session)
    }

    fn run<T, F>(&mut self, operation: F) -> SessionResult<T>
    where
        F: FnOnce(&mut FtpStream) -> Result<T, FtpError>,
    {
        let stream = self.stream.as_mut().ok_or(SessionError::Disconnected)?;
        let result = operation(stream);
        result.map_err(|error| self.fail(error))
    }

    /// Converts a failure and drops the control connection when its reply
    /// stream can no longer be trusted: after a socket error, after a timeout
    /// whose late reply would be read as the answer to the next command, and
    /// after a `421` closing notice.
    fn fail(&mut self, error: FtpError) -> SessionError {
        let error = convert(error);
        if matches!(error, SessionError::Io(_)) || error.is_connection_loss() {
            tracing::debug!(target: "ftpush::ftp", error = %error, "dropping control connection");
            self.reset();
        }
        error
    }

    fn reset(&mut self) {
        self.stream = None;
        self.features = None;
        self.directory = None;
    }

    fn current_directory(&mut self) -> SessionResult<String> {
        if let Some(directory) = &self.directory {
            return Ok(directory.clone());
        }
        let directory = self.run(FtpStream::pwd)?;
        self.directory = Some(directory.clone());
        Ok(directory)
    }

    fn features(&mut self) -> SessionResult<&HashSet<String>> {
        if self.features.is_none() {
            let features = match self.run(|stream| stream.custom_command("FEAT", &[Status::System])) {
                Ok(response) => parse_features(&String::from_utf8_lossy(&response.body)),
                Err(SessionError::Status { code: 500 | 502, .. }) => HashSet::new(),
                Err(error) => return Err(error),
            };
            tracing::debug!(target: "ftpush::ftp", features = ?features, "server features");
            self.features = Some(features);
        }
        Ok(self.features.get_or_insert_with(HashSet::new))
    }
}

impl fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSession")
            .field("settings", &self.settings)
            .field("connected", &self.stream.is_some())
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl Session for FtpSession {
    fn connect(&mut self) -> SessionResult<()> {
        if let Some(mut previous) = self.stream.take() {
            if let Err(error) = previous.quit() {
                tracing::debug!(target: "ftpush::ftp", error = %error, "discarding stale connection");
            }
        }
        self.reset();

        let settings = Arc::clone(&self.settings);
        let address = settings.socket_address()?;
        let mut stream = FtpStream::connect_timeout(address, settings.timeout).map_err(convert)?;
        stream.get_ref().set_read_timeout(Some(settings.timeout))?;
        stream.get_ref().set_write_timeout(Some(settings.timeout))?;
        stream
            .login(settings.username.as_str(), settings.password.as_str())
            .map_err(convert)?;
        stream.set_mode(match settings.mode {
            TransferMode::Passive => Mode::Passive,
            TransferMode::Active => Mode::Active,
        });

        tracing::debug!(
            target: "ftpush::ftp",
            host = %settings.host,
            port = settings.port,
            user = %settings.username,
            "logged in"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn change_working_directory(&mut self, path: &str) -> SessionResult<()> {
        self.run(|stream| stream.cwd(path))?;
        self.directory = match self.directory.take() {
            _ if path.starts_with('/') => Some(path.to_owned()),
            Some(base) => Some(join(&base, path)),
            None => None,
        };
        Ok(())
    }

    fn list_directory(&mut self, path: Option<&str>) -> SessionResult<Vec<RemoteEntry>> {
        let machine = self.has_capability(Capability::ObjectInfo)?;
        let lines = if machine {
            self.run(|stream| stream.mlsd(path))?
        } else {
            self.run(|stream| stream.list(path))?
        };
        let base = match path {
            Some(path) if path.starts_with('/') => path.to_owned(),
            Some(path) => join(&self.current_directory()?, path),
            None => self.current_directory()?,
        };
        Ok(if machine {
            parse_machine_listing(&base, &lines)
        } else {
            parse_listing(&base, &lines)
        })
    }

    fn create_directory(&mut self, name: &str) -> SessionResult<()> {
        self.run(|stream| stream.mkdir(name))
    }

    fn remove_directory(&mut self, name: &str) -> SessionResult<()> {
        self.run(|stream| stream.rmdir(name))
    }

    fn delete_file(&mut self, name: &str) -> SessionResult<()> {
        self.run(|stream| stream.rm(name))
    }

    fn write_file(&mut self, name: &str, mut source: &mut dyn Read) -> SessionResult<u64> {
        self.run(|stream| stream.put_file(name, &mut source))
    }

    fn set_modified_time(&mut self, name: &str, modified: SystemTime) -> SessionResult<()> {
        let stamp = format_timestamp(modified)?;
        let verb = if self.has_capability(Capability::ModifyTime)? {
            "MFMT"
        } else {
            "MDTM"
        };
        self.run(|stream| {
            stream.custom_command(
                format!("{verb} {stamp} {name}"),
                &[Status::File, Status::CommandOk],
            )
        })
        .map(drop)
    }

    fn has_capability(&mut self, capability: Capability) -> SessionResult<bool> {
        Ok(self.features()?.contains(capability.feature_name()))
    }

    fn object_info(&mut self, path: &str) -> SessionResult<Option<RemoteEntry>> {
        if !self.has_capability(Capability::ObjectInfo)? {
            return Err(SessionError::MissingCapability(Capability::ObjectInfo));
        }
        match self.run(|stream| {
            stream.custom_command(format!("MLST {path}"), &[Status::RequestedFileActionOk])
        }) {
            Ok(response) => Ok(parse_object_info(&String::from_utf8_lossy(&response.body))),
            Err(error) if error.has_code(crate::status::FILE_UNAVAILABLE) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn close(&mut self) -> SessionResult<()> {
        let stream = self.stream.take();
        self.reset();
        match stream {
            Some(mut stream) => stream.quit().map_err(convert),
            None => Ok(()),
        }
    }
}

fn convert(error: FtpError) -> SessionError {
    match error {
        FtpError::ConnectionError(error) => SessionError::Io(error),
        FtpError::UnexpectedResponse(response) => {
            let text = String::from_utf8_lossy(&response.body);
            let message = text
                .lines()
                .last()
                .unwrap_or_default()
                .get(4..)
                .unwrap_or_default()
                .trim()
                .to_owned();
            SessionError::status(response.status.code(), message)
        }
        other => SessionError::Protocol(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::*;
    use crate::{Disposition, classify};

    enum Reply {
        Send(&'static str),
        Silence,
    }

    /// Serves one control connection: a greeting, then one scripted reply per
    /// command received. `Silence` reads the command and never answers.
    fn scripted_server(replies: Vec<Reply>) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let mut commands = Vec::new();
            let _ = writer.write_all(b"220 ready\r\n");
            for reply in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                commands.push(line.trim_end().to_owned());
                match reply {
                    Reply::Send(text) => {
                        let _ = writer.write_all(text.as_bytes());
                    }
                    Reply::Silence => {
                        let mut rest = String::new();
                        let _ = reader.read_line(&mut rest);
                        break;
                    }
                }
            }
            commands
        });
        (port, handle)
    }

    fn session(port: u16) -> FtpSession {
        let settings = FtpSettings::new("127.0.0.1", "user", "secret")
            .with_port(port)
            .with_timeout(Duration::from_millis(300));
        FtpSession::open(Arc::new(settings)).unwrap()
    }

    #[test]
    fn timed_out_reply_drops_the_control_connection() {
        let (port, server) = scripted_server(vec![Reply::Send("230 Logged in\r\n"), Reply::Silence]);
        let mut session = session(port);

        let error = session.create_directory("slow").unwrap_err();

        assert!(error.is_timeout(), "{error:?}");
        assert!(!session.is_connected());
        let commands = server.join().unwrap();
        assert_eq!(commands, ["USER user", "MKD slow"]);
    }

    #[test]
    fn closing_notice_drops_the_control_connection() {
        let (port, server) = scripted_server(vec![
            Reply::Send("230 Logged in\r\n"),
            Reply::Send("421 Idle timeout, closing control connection\r\n"),
        ]);
        let mut session = session(port);

        let error = session.delete_file("a.txt").unwrap_err();

        assert_eq!(error.code(), Some(421));
        assert_eq!(classify(&error), Disposition::RetryReconnect);
        assert!(!session.is_connected());
        server.join().unwrap();
    }

    #[test]
    fn rejected_command_keeps_the_control_connection() {
        let (port, server) = scripted_server(vec![
            Reply::Send("230 Logged in\r\n"),
            Reply::Send("550 No such file\r\n"),
        ]);
        let mut session = session(port);

        let error = session.delete_file("missing.txt").unwrap_err();

        assert_eq!(error.code(), Some(550));
        assert!(session.is_connected());
        drop(session);
        server.join().unwrap();
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let settings = FtpSettings::new("example.com", "user", "secret");
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret"));
    }
}
