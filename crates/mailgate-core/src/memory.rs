// crates/mailgate-core/src/memory.rs
// ============================================================================
// Module: In-Memory Mail Transport
// Description: Process-local mail transport for tests and local runs.
// Purpose: Exercise the transport contract without network access.
// Dependencies: crate::mail, async-trait
// ============================================================================

//! ## Overview
//! [`InMemoryMailTransport`] keeps per-account mailboxes keyed by the IMAP
//! username it is called with, so two agents resolving different credentials
//! see different mail. Sent messages and Sent-folder appends are recorded for
//! inspection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use crate::mail::AttachmentContent;
use crate::mail::EmailConfig;
use crate::mail::ImapConfig;
use crate::mail::MailError;
use crate::mail::MailTransport;
use crate::mail::Mailbox;
use crate::mail::MessageDetail;
use crate::mail::MessageSummary;
use crate::mail::OutgoingMessage;
use crate::mail::SearchCriteria;
use crate::mail::SentMessage;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Key of one attachment part: account, mailbox, uid, part.
type PartKey = (String, String, u32, String);

/// Mutable transport state.
#[derive(Debug, Default)]
struct MemoryState {
    /// Messages per (account, mailbox).
    mailboxes: BTreeMap<(String, String), Vec<MessageDetail>>,
    /// Attachment bytes per part.
    attachments: BTreeMap<PartKey, AttachmentContent>,
    /// Submitted messages with the SMTP settings they were sent with.
    sent: Vec<(EmailConfig, OutgoingMessage)>,
    /// Raw messages appended to Sent, per account.
    appended: Vec<(String, Vec<u8>)>,
    /// When set, Sent-folder appends fail.
    fail_appends: bool,
}

/// In-memory mail transport for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMailTransport {
    /// Shared state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryMailTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a message in the account's mailbox named by `message.mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the state mutex is poisoned.
    pub fn insert_message(&self, account: &str, message: MessageDetail) -> Result<(), MailError> {
        let mut state = self.lock()?;
        state
            .mailboxes
            .entry((account.to_string(), message.mailbox.clone()))
            .or_default()
            .push(message);
        Ok(())
    }

    /// Stores attachment bytes for a message part.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the state mutex is poisoned.
    pub fn insert_attachment(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        part: &str,
        content: AttachmentContent,
    ) -> Result<(), MailError> {
        let mut state = self.lock()?;
        state.attachments.insert(
            (account.to_string(), mailbox.to_string(), uid, part.to_string()),
            content,
        );
        Ok(())
    }

    /// Makes subsequent Sent-folder appends fail (or succeed again).
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the state mutex is poisoned.
    pub fn set_append_failure(&self, fail: bool) -> Result<(), MailError> {
        self.lock()?.fail_appends = fail;
        Ok(())
    }

    /// Returns submitted messages and the SMTP settings used for each.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the state mutex is poisoned.
    pub fn sent(&self) -> Result<Vec<(EmailConfig, OutgoingMessage)>, MailError> {
        Ok(self.lock()?.sent.clone())
    }

    /// Returns raw messages appended to Sent, with the account they went to.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the state mutex is poisoned.
    pub fn appended(&self) -> Result<Vec<(String, Vec<u8>)>, MailError> {
        Ok(self.lock()?.appended.clone())
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, MailError> {
        self.state
            .lock()
            .map_err(|_| MailError::Protocol("in-memory transport mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Transport Implementation
// ============================================================================

#[async_trait]
impl MailTransport for InMemoryMailTransport {
    async fn list_mailboxes(&self, config: &ImapConfig) -> Result<Vec<Mailbox>, MailError> {
        let state = self.lock()?;
        Ok(state
            .mailboxes
            .keys()
            .filter(|(account, _)| account == &config.user)
            .map(|(_, name)| Mailbox {
                name: name.clone(),
                delimiter: Some("/".to_string()),
                flags: Vec::new(),
            })
            .collect())
    }

    async fn list_messages(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageSummary>, MailError> {
        let state = self.lock()?;
        let messages = mailbox_messages(&state, config, mailbox)?;
        Ok(messages.iter().rev().skip(offset).take(limit).map(summarize).collect())
    }

    async fn get_message(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        uid: u32,
    ) -> Result<MessageDetail, MailError> {
        let state = self.lock()?;
        mailbox_messages(&state, config, mailbox)?
            .iter()
            .find(|message| message.uid == uid)
            .cloned()
            .ok_or_else(|| MailError::NotFound(format!("message {uid} in {mailbox}")))
    }

    async fn search_messages(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<MessageSummary>, MailError> {
        let state = self.lock()?;
        let messages = mailbox_messages(&state, config, mailbox)?;
        let limit = criteria.limit.unwrap_or(usize::MAX);
        // Date bounds are left to real servers; this transport does not parse dates.
        Ok(messages
            .iter()
            .rev()
            .filter(|message| matches_criteria(message, criteria))
            .take(limit)
            .map(summarize)
            .collect())
    }

    async fn download_attachment(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        uid: u32,
        part: &str,
    ) -> Result<AttachmentContent, MailError> {
        let state = self.lock()?;
        state
            .attachments
            .get(&(config.user.clone(), mailbox.to_string(), uid, part.to_string()))
            .cloned()
            .ok_or_else(|| MailError::NotFound(format!("part {part} of message {uid}")))
    }

    async fn append_to_sent(&self, config: &ImapConfig, raw: &[u8]) -> Result<(), MailError> {
        let mut state = self.lock()?;
        if state.fail_appends {
            return Err(MailError::Protocol("APPEND rejected".to_string()));
        }
        state.appended.push((config.user.clone(), raw.to_vec()));
        Ok(())
    }

    async fn send_mail(
        &self,
        config: &EmailConfig,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, MailError> {
        if message.to.is_empty() {
            return Err(MailError::Rejected("no recipients".to_string()));
        }
        let mut state = self.lock()?;
        state.sent.push((config.clone(), message.clone()));
        let message_id = format!("<{}@{}>", state.sent.len(), config.host);
        let raw = render_raw(message, &message_id).into_bytes();
        let accepted =
            message.to.iter().chain(&message.cc).chain(&message.bcc).cloned().collect();
        Ok(SentMessage {
            message_id: Some(message_id),
            accepted,
            rejected: Vec::new(),
            raw: Some(raw),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the messages of one account mailbox.
fn mailbox_messages<'a>(
    state: &'a MemoryState,
    config: &ImapConfig,
    mailbox: &str,
) -> Result<&'a Vec<MessageDetail>, MailError> {
    state
        .mailboxes
        .get(&(config.user.clone(), mailbox.to_string()))
        .ok_or_else(|| MailError::NotFound(format!("mailbox {mailbox}")))
}

/// Projects a full message to its summary.
fn summarize(message: &MessageDetail) -> MessageSummary {
    MessageSummary {
        uid: message.uid,
        mailbox: message.mailbox.clone(),
        from: message.from.clone(),
        to: message.to.clone(),
        subject: message.subject.clone(),
        date: message.date.clone(),
        flags: message.flags.clone(),
        has_attachments: !message.attachments.is_empty(),
    }
}

/// Case-insensitive substring match.
fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Applies the non-date search filters.
fn matches_criteria(message: &MessageDetail, criteria: &SearchCriteria) -> bool {
    if let Some(from) = &criteria.from
        && !contains(&message.from, from)
    {
        return false;
    }
    if let Some(to) = &criteria.to
        && !message.to.iter().any(|address| contains(address, to))
    {
        return false;
    }
    if let Some(subject) = &criteria.subject
        && !message.subject.as_deref().is_some_and(|value| contains(value, subject))
    {
        return false;
    }
    if let Some(text) = &criteria.text {
        let in_body = [message.text.as_deref(), message.html.as_deref()]
            .into_iter()
            .flatten()
            .any(|body| contains(body, text));
        if !in_body {
            return false;
        }
    }
    if criteria.unseen && message.flags.iter().any(|flag| flag == "\\Seen") {
        return false;
    }
    true
}

/// Renders a minimal RFC 5322 message for Sent-folder appends.
fn render_raw(message: &OutgoingMessage, message_id: &str) -> String {
    let mut raw = String::new();
    raw.push_str(&format!("From: {}\r\n", message.from));
    raw.push_str(&format!("To: {}\r\n", message.to.join(", ")));
    if !message.cc.is_empty() {
        raw.push_str(&format!("Cc: {}\r\n", message.cc.join(", ")));
    }
    if let Some(reply_to) = &message.reply_to {
        raw.push_str(&format!("Reply-To: {reply_to}\r\n"));
    }
    raw.push_str(&format!("Subject: {}\r\n", message.subject));
    raw.push_str(&format!("Message-ID: {message_id}\r\n\r\n"));
    raw.push_str(message.text.as_deref().or(message.html.as_deref()).unwrap_or_default());
    raw
}
