//! Client session handling
//!
//! One session per connection. After a username is registered the session
//! runs two tasks: the input side reads lines and dispatches commands, and
//! the drainer writes mailbox records to the connection. Both stop on a
//! shared one-shot close signal.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::command::{help_menu, parse_input, Command, Input};
use crate::error::ChatError;
use crate::mailbox::{mailbox, MailboxReceiver};
use crate::message::{
    listing, BANNER_CHANNELS, BANNER_MY_CHANNELS, BANNER_USERS, FAREWELL, PROMPT_IGNORE,
    PROMPT_JOIN, PROMPT_LEAVE, PROMPT_MESSAGE, PROMPT_NEW_CHANNEL, PROMPT_PM_USER,
    PROMPT_SEND_CHANNEL, PROMPT_UNIGNORE, PROMPT_USERNAME, USERNAME_TAKEN, WELCOME,
};
use crate::service::ChatService;
use crate::types::{validate_name, validate_username, Origin, SessionId};

/// Longest input line accepted, excluding the terminator
pub const MAX_LINE_LEN: usize = 4096;

/// One-shot signal that stops both tasks of a session
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal; later calls are no-ops
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has fired
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for cannot fail
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Usernames whose records the drainer drops
///
/// Checked at drain time, so toggling applies to records already queued.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl IgnoreList {
    /// Returns false if the user was already ignored
    pub async fn insert(&self, name: &str) -> bool {
        self.inner.write().await.insert(name.to_string())
    }

    /// Returns false if the user was not ignored
    pub async fn remove(&self, name: &str) -> bool {
        self.inner.write().await.remove(name)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.contains(name)
    }
}

/// Newline-framed reader over the connection
struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Read one line without its `\r\n` terminator
    ///
    /// Fails with `LineTooLong` instead of buffering past `MAX_LINE_LEN`.
    async fn read_line(&mut self) -> Result<String, ChatError> {
        self.buf.clear();
        // Room for the longest line plus "\r\n"
        let limit = (MAX_LINE_LEN + 2) as u64;
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Err(ChatError::Disconnected);
        }
        if !self.buf.ends_with(b"\n") && self.buf.len() as u64 == limit {
            return Err(ChatError::LineTooLong(MAX_LINE_LEN));
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Shared write half of the connection
///
/// Both the input side (replies, prompts) and the drainer write through
/// it; each call writes a whole block under the lock.
struct Output<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for Output<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: AsyncWrite + Unpin> Output<W> {
    fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    async fn write_str(&self, text: &str) -> Result<(), ChatError> {
        let mut writer = self.inner.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn write_line(&self, line: &str) -> Result<(), ChatError> {
        self.write_str(&format!("{}\n", line)).await
    }
}

/// What the input loop does after a command
enum Flow {
    Continue,
    Quit,
}

/// Run a session over an established connection
///
/// Returns once the client quits or disconnects. I/O errors end this
/// session only.
pub async fn run_session<R, W>(
    service: ChatService,
    reader: R,
    writer: W,
    peer: &str,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut input = LineReader::new(reader);
    let output = Output::new(writer);

    let (username, session_id, receiver) = match register(&service, &mut input, &output).await {
        Ok(registered) => registered,
        Err(ChatError::Disconnected) => {
            debug!("Peer {} left before registering", peer);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    info!("Session {} started for '{}' from {}", session_id, username, peer);

    let close = CloseSignal::new();
    let ignored = IgnoreList::default();

    let drainer = tokio::spawn(drain(
        receiver,
        output.clone(),
        ignored.clone(),
        close.clone(),
        session_id,
    ));

    let mut session = Session {
        username,
        session_id,
        service,
        input,
        output,
        ignored,
        close,
        shut_down: false,
    };

    let result = session.run().await;
    // Implicit quit on read failure or disconnect
    session.shutdown().await;
    let _ = drainer.await;

    match result {
        Ok(()) | Err(ChatError::Disconnected) => {
            info!("Session {} ended for '{}'", session_id, session.username);
            Ok(())
        }
        Err(e) => {
            warn!("Session {} for '{}' failed: {}", session_id, session.username, e);
            Err(e)
        }
    }
}

/// Prompt until a free username is registered
async fn register<R, W>(
    service: &ChatService,
    input: &mut LineReader<R>,
    output: &Output<W>,
) -> Result<(String, SessionId, MailboxReceiver), ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        output.write_str(PROMPT_USERNAME).await?;
        let line = input.read_line().await?;

        let name = match validate_username(&line) {
            Ok(name) => name.to_string(),
            Err(e) => {
                output.write_line(&format!("invalid username. error: {}", e)).await?;
                continue;
            }
        };

        let (mailbox, receiver) = mailbox(service.mailbox_capacity());
        match service.directory().register(&name, mailbox).await {
            Ok(session_id) => return Ok((name, session_id, receiver)),
            Err(ChatError::UserAlreadyExists(_)) => {
                debug!("Username '{}' taken, prompting again", name);
                output.write_line(USERNAME_TAKEN).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drainer task: mailbox -> connection
async fn drain<W>(
    mut receiver: MailboxReceiver,
    output: Output<W>,
    ignored: IgnoreList,
    close: CloseSignal,
    session_id: SessionId,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let record = tokio::select! {
            biased;
            _ = close.closed() => break,
            record = receiver.next() => record,
        };
        let Some(record) = record else {
            break;
        };

        if ignored.contains(&record.sender).await {
            debug!("Session {} dropped record from ignored '{}'", session_id, record.sender);
            continue;
        }

        let written = tokio::select! {
            biased;
            _ = close.closed() => break,
            written = output.write_line(&record.line) => written,
        };
        if let Err(e) = written {
            warn!("Session {} write failed: {}", session_id, e);
            close.fire();
            break;
        }
    }

    receiver.close();
    debug!("Drainer ended for session {}", session_id);
}

/// Input side of an active session
struct Session<R, W> {
    username: String,
    session_id: SessionId,
    service: ChatService,
    input: LineReader<R>,
    output: Output<W>,
    ignored: IgnoreList,
    close: CloseSignal,
    shut_down: bool,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(&mut self) -> Result<(), ChatError> {
        self.output.write_str(&help_menu()).await?;
        self.output.write_line(WELCOME).await?;

        loop {
            let line = self.next_line().await?;

            let input = match parse_input(&line) {
                Ok(input) => input,
                Err(e) => {
                    self.report(&e).await?;
                    continue;
                }
            };

            match input {
                Input::Empty => {}
                Input::Chat(text) => {
                    self.service.router().send_to_all(&self.origin(), &text).await;
                }
                Input::Command(command) => match self.dispatch(command).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => return Ok(()),
                    Err(e) if e.is_user_error() => self.report(&e).await?,
                    Err(e) => return Err(e),
                },
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Flow, ChatError> {
        debug!("Session {} running {}", self.session_id, command.token());
        match command {
            Command::Quit => return self.quit().await,
            Command::ListChannels => self.list_channels().await?,
            Command::ListUsers => self.list_users().await?,
            Command::Create => self.create_channel().await?,
            Command::Join => self.join_channel().await?,
            Command::Leave => self.leave_channel().await?,
            Command::IgnoreUser => self.ignore_user().await?,
            Command::UnignoreUser => self.unignore_user().await?,
            Command::PrivateMessage => self.send_pm().await?,
            Command::SendChannel => self.send_to_channel().await?,
            Command::ListMyChannels => self.list_my_channels().await?,
            Command::Help => self.output.write_str(&help_menu()).await?,
        }
        Ok(Flow::Continue)
    }

    fn origin(&self) -> Origin {
        Origin::User(self.username.clone())
    }

    /// Next input line, or Disconnected once the close signal fires
    async fn next_line(&mut self) -> Result<String, ChatError> {
        tokio::select! {
            biased;
            _ = self.close.closed() => Err(ChatError::Disconnected),
            line = self.input.read_line() => line,
        }
    }

    async fn prompt(&mut self, text: &str) -> Result<String, ChatError> {
        self.output.write_str(text).await?;
        self.next_line().await
    }

    async fn report(&self, error: &ChatError) -> Result<(), ChatError> {
        self.output
            .write_line(&format!("invalid command. error: {}", error))
            .await
    }

    /// Remove the user from the Directory and stop both tasks
    ///
    /// Runs once; later calls are no-ops.
    async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let directory = self.service.directory();
        if directory.unregister(&self.username, self.session_id).await {
            debug!("Session {} removed from directory", self.session_id);
        }
        self.close.fire();
    }

    async fn quit(&mut self) -> Result<Flow, ChatError> {
        self.shutdown().await;
        info!("User '{}' quit", self.username);
        self.output.write_line(FAREWELL).await?;
        Ok(Flow::Quit)
    }

    async fn list_channels(&mut self) -> Result<(), ChatError> {
        let channels = self.service.directory().list_channels().await;
        self.output.write_str(&listing(BANNER_CHANNELS, channels)).await
    }

    async fn list_users(&mut self) -> Result<(), ChatError> {
        let users = self.service.directory().list_users().await;
        self.output.write_str(&listing(BANNER_USERS, users)).await
    }

    async fn list_my_channels(&mut self) -> Result<(), ChatError> {
        let channels = self
            .service
            .directory()
            .user_channels(&self.username)
            .await
            .unwrap_or_default();
        self.output
            .write_str(&listing(BANNER_MY_CHANNELS, channels))
            .await
    }

    async fn create_channel(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_NEW_CHANNEL).await?;
        let name = validate_name(&line)?;
        self.service.directory().create_channel(name).await?;
        self.output
            .write_line(&format!("Channel: {} created", name))
            .await
    }

    async fn join_channel(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_JOIN).await?;
        let name = validate_name(&line)?;
        self.service.directory().join(&self.username, name).await?;
        self.output
            .write_line(&format!("Joined channel: {}", name))
            .await
    }

    async fn leave_channel(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_LEAVE).await?;
        let name = validate_name(&line)?;
        self.service.directory().leave(&self.username, name).await?;
        self.output
            .write_line(&format!("Left channel: {}", name))
            .await
    }

    async fn ignore_user(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_IGNORE).await?;
        let name = validate_name(&line)?;
        if self.service.directory().lookup_user(name).await.is_none() {
            return Err(ChatError::UserNotFound(name.to_string()));
        }
        if !self.ignored.insert(name).await {
            debug!("Session {} already ignores '{}'", self.session_id, name);
        }
        self.output
            .write_line(&format!("Ignored user: {}", name))
            .await
    }

    async fn unignore_user(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_UNIGNORE).await?;
        let name = line.trim();
        if !self.ignored.remove(name).await {
            return Err(ChatError::NotIgnored(name.to_string()));
        }
        self.output
            .write_line(&format!("Unignored user: {}", name))
            .await
    }

    async fn send_pm(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_PM_USER).await?;
        let target = validate_name(&line)?.to_string();
        if self.service.directory().lookup_user(&target).await.is_none() {
            return Err(ChatError::UserNotFound(target));
        }

        let body = self.prompt(PROMPT_MESSAGE).await?;
        self.service
            .router()
            .send_to_user(&self.origin(), &body, &target)
            .await
    }

    async fn send_to_channel(&mut self) -> Result<(), ChatError> {
        let line = self.prompt(PROMPT_SEND_CHANNEL).await?;
        let channel = validate_name(&line)?.to_string();
        if !self.service.directory().has_channel(&channel).await {
            return Err(ChatError::ChannelNotFound(channel));
        }

        let body = self.prompt(PROMPT_MESSAGE).await?;
        self.service
            .router()
            .send_to_channel(&self.origin(), &body, &channel)
            .await
            .map(|_| ())
    }
}
