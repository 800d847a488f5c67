//! Worker jobs for backend fetches: list snapshots (companies, roles,
//! microphones) and relay posts (content, chat). Each job runs on its own
//! thread, sends exactly one message back, and carries the generation it
//! was launched under so the UI can discard snapshots that a newer
//! selection has made stale.

use crate::api::{ApiClient, ChatOutcome, Microphone, SectionType};
use crate::{log_debug, log_timing};
#[cfg(test)]
use std::sync::Mutex;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

/// What a list job was asked to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRequest {
    Companies,
    Roles { company: String },
    Microphones,
}

impl ListRequest {
    fn label(&self) -> &'static str {
        match self {
            ListRequest::Companies => "companies",
            ListRequest::Roles { .. } => "roles",
            ListRequest::Microphones => "microphones",
        }
    }
}

/// Snapshot delivered by a finished list job. Errors cross the channel as
/// strings so messages stay comparable in tests.
#[derive(Debug, PartialEq, Eq)]
pub enum ListJobMessage {
    Companies(Result<Vec<String>, String>),
    Roles(Result<Vec<String>, String>),
    Microphones(Result<Vec<Microphone>, String>),
}

/// Handle the UI polls for a list snapshot.
pub struct ListJob {
    pub generation: u64,
    pub receiver: mpsc::Receiver<ListJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
}

/// Spawn a worker that fetches one list snapshot.
pub fn start_list_job(api: Arc<ApiClient>, request: ListRequest, generation: u64) -> ListJob {
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let started = Instant::now();
        let label = request.label();
        let message = fetch_list(&api, &request);
        log_timing(&format!(
            "phase=list_{label}|ms={}",
            started.elapsed().as_millis()
        ));
        tx.send(message).ok();
    });

    ListJob {
        generation,
        receiver: rx,
        handle: Some(handle),
    }
}

fn fetch_list(api: &ApiClient, request: &ListRequest) -> ListJobMessage {
    #[cfg(test)]
    if let Some(hook) = list_hook_slot().as_ref() {
        return hook(request);
    }
    match request {
        ListRequest::Companies => ListJobMessage::Companies(stringify(api.list_companies())),
        ListRequest::Roles { company } => ListJobMessage::Roles(stringify(api.list_roles(company))),
        ListRequest::Microphones => ListJobMessage::Microphones(stringify(api.list_microphones())),
    }
}

/// What a relay job was asked to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRequest {
    Content {
        company: String,
        role: String,
        section: SectionType,
    },
    Chat {
        message: String,
        company: String,
        role: String,
    },
}

/// Coarse request kind, kept on the job so the UI knows what is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Content,
    Chat,
}

impl RelayRequest {
    pub fn kind(&self) -> RelayKind {
        match self {
            RelayRequest::Content { .. } => RelayKind::Content,
            RelayRequest::Chat { .. } => RelayKind::Chat,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RelayRequest::Content { .. } => "content",
            RelayRequest::Chat { .. } => "chat",
        }
    }
}

/// Reply delivered by a finished relay job.
#[derive(Debug, PartialEq, Eq)]
pub enum RelayJobMessage {
    Content(Result<String, String>),
    Chat(Result<ChatOutcome, String>),
}

/// Handle the UI polls for a relay reply.
pub struct RelayJob {
    pub kind: RelayKind,
    pub generation: u64,
    pub receiver: mpsc::Receiver<RelayJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
}

/// Spawn a worker that posts a chat message or content request.
pub fn start_relay_job(api: Arc<ApiClient>, request: RelayRequest, generation: u64) -> RelayJob {
    let (tx, rx) = mpsc::channel();
    let kind = request.kind();

    let handle = thread::spawn(move || {
        let started = Instant::now();
        let label = request.label();
        log_debug(&format!("relay job: {label}"));
        let message = post_relay(&api, &request);
        log_timing(&format!(
            "phase={label}|ms={}",
            started.elapsed().as_millis()
        ));
        tx.send(message).ok();
    });

    RelayJob {
        kind,
        generation,
        receiver: rx,
        handle: Some(handle),
    }
}

fn post_relay(api: &ApiClient, request: &RelayRequest) -> RelayJobMessage {
    #[cfg(test)]
    if let Some(hook) = relay_hook_slot().as_ref() {
        return hook(request);
    }
    match request {
        RelayRequest::Content {
            company,
            role,
            section,
        } => RelayJobMessage::Content(stringify(api.content(company, role, *section))),
        RelayRequest::Chat {
            message,
            company,
            role,
        } => RelayJobMessage::Chat(stringify(api.chat(message, company, role))),
    }
}

fn stringify<T>(result: anyhow::Result<T>) -> Result<T, String> {
    result.map_err(|err| format!("{err:#}"))
}

#[cfg(test)]
type ListHook = Box<dyn Fn(&ListRequest) -> ListJobMessage + Send + 'static>;

#[cfg(test)]
static LIST_HOOK: Mutex<Option<ListHook>> = Mutex::new(None);

#[cfg(test)]
fn list_hook_slot() -> std::sync::MutexGuard<'static, Option<ListHook>> {
    match LIST_HOOK.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Route list fetches through `hook` for the duration of `f`. Hook-using
/// tests are serialized because the slot is process-wide.
#[cfg(test)]
pub(crate) fn with_list_hook<R>(hook: ListHook, f: impl FnOnce() -> R) -> R {
    static SERIAL: Mutex<()> = Mutex::new(());
    let _serial = match SERIAL.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    struct ClearHook;
    impl Drop for ClearHook {
        fn drop(&mut self) {
            *list_hook_slot() = None;
        }
    }

    *list_hook_slot() = Some(hook);
    // Cleared on drop so a panicking test cannot leak its hook.
    let _clear = ClearHook;
    f()
}

#[cfg(test)]
type RelayHook = Box<dyn Fn(&RelayRequest) -> RelayJobMessage + Send + 'static>;

#[cfg(test)]
static RELAY_HOOK: Mutex<Option<RelayHook>> = Mutex::new(None);

#[cfg(test)]
fn relay_hook_slot() -> std::sync::MutexGuard<'static, Option<RelayHook>> {
    match RELAY_HOOK.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Relay counterpart of [`with_list_hook`], covering content and chat posts.
#[cfg(test)]
pub(crate) fn with_relay_hook<R>(hook: RelayHook, f: impl FnOnce() -> R) -> R {
    static SERIAL: Mutex<()> = Mutex::new(());
    let _serial = match SERIAL.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    struct ClearHook;
    impl Drop for ClearHook {
        fn drop(&mut self) {
            *relay_hook_slot() = None;
        }
    }

    *relay_hook_slot() = Some(hook);
    let _clear = ClearHook;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_api() -> Arc<ApiClient> {
        Arc::new(
            ApiClient::with_timeouts(
                "http://127.0.0.1:9",
                Duration::from_millis(100),
                Duration::from_millis(100),
            )
            .expect("client"),
        )
    }

    fn finish_list_job(mut job: ListJob) -> ListJobMessage {
        let message = job
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("list job should send one message");
        if let Some(worker) = job.handle.take() {
            worker.join().ok();
        }
        message
    }

    fn finish_relay_job(mut job: RelayJob) -> RelayJobMessage {
        let message = job
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("relay job should send one message");
        if let Some(worker) = job.handle.take() {
            worker.join().ok();
        }
        message
    }

    #[test]
    fn list_job_delivers_hooked_snapshot_with_generation() {
        let message = with_list_hook(
            Box::new(|request| {
                assert_eq!(request, &ListRequest::Companies);
                ListJobMessage::Companies(Ok(vec!["Acme".to_string()]))
            }),
            || {
                let job = start_list_job(test_api(), ListRequest::Companies, 7);
                assert_eq!(job.generation, 7);
                finish_list_job(job)
            },
        );
        assert_eq!(
            message,
            ListJobMessage::Companies(Ok(vec!["Acme".to_string()]))
        );
    }

    #[test]
    fn roles_request_names_the_company() {
        let message = with_list_hook(
            Box::new(|request| {
                match request {
                    ListRequest::Roles { company } => assert_eq!(company, "Acme Corp"),
                    other => panic!("unexpected request {other:?}"),
                }
                ListJobMessage::Roles(Ok(vec!["Engineer".to_string()]))
            }),
            || {
                let job = start_list_job(
                    test_api(),
                    ListRequest::Roles {
                        company: "Acme Corp".to_string(),
                    },
                    1,
                );
                finish_list_job(job)
            },
        );
        assert_eq!(message, ListJobMessage::Roles(Ok(vec!["Engineer".to_string()])));
    }

    #[test]
    fn content_relay_carries_the_full_payload() {
        let message = with_relay_hook(
            Box::new(|request| {
                assert_eq!(
                    request,
                    &RelayRequest::Content {
                        company: "Acme".to_string(),
                        role: "Engineer".to_string(),
                        section: SectionType::Tips,
                    }
                );
                RelayJobMessage::Content(Ok("Be confident.".to_string()))
            }),
            || {
                let job = start_relay_job(
                    test_api(),
                    RelayRequest::Content {
                        company: "Acme".to_string(),
                        role: "Engineer".to_string(),
                        section: SectionType::Tips,
                    },
                    3,
                );
                assert_eq!(job.generation, 3);
                assert_eq!(job.kind, RelayKind::Content);
                finish_relay_job(job)
            },
        );
        assert_eq!(
            message,
            RelayJobMessage::Content(Ok("Be confident.".to_string()))
        );
    }

    #[test]
    fn chat_relay_carries_message_and_selection() {
        let message = with_relay_hook(
            Box::new(|request| {
                match request {
                    RelayRequest::Chat {
                        message,
                        company,
                        role,
                    } => {
                        assert_eq!(message, "How should I prepare?");
                        assert_eq!(company, "Acme");
                        assert_eq!(role, "Engineer");
                    }
                    other => panic!("unexpected request {other:?}"),
                }
                RelayJobMessage::Chat(Ok(ChatOutcome::Response("Practice.".to_string())))
            }),
            || {
                let job = start_relay_job(
                    test_api(),
                    RelayRequest::Chat {
                        message: "How should I prepare?".to_string(),
                        company: "Acme".to_string(),
                        role: "Engineer".to_string(),
                    },
                    2,
                );
                finish_relay_job(job)
            },
        );
        assert_eq!(
            message,
            RelayJobMessage::Chat(Ok(ChatOutcome::Response("Practice.".to_string())))
        );
    }

    #[test]
    fn stringify_formats_error_chains() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("root cause").context("request failed"));
        let stringified = stringify(result);
        let err = stringified.expect_err("should be an error");
        assert!(err.contains("request failed"));
        assert!(err.contains("root cause"));
    }
}
