//! Device gateway: claims the control endpoint and serves client sessions.

use crate::{dispatch::Dispatcher, BindingSlot};
use plclk_gateway_error::{protocol::ProtocolError, registration::RegistrationError};
use plclk_gateway_models::{
    proto::WireDecode, read_frame, write_frame, ControlRequest, ControlResponse, FrameRead,
    MAX_FRAME_LEN,
};
use std::{io, os::unix::fs::PermissionsExt, path::PathBuf, time::Duration};
use tokio::{
    net::{UnixListener, UnixStream},
    sync::Mutex,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The allocated endpoint plus the installed dispatch loop. Dropped as a
/// unit on `stop`.
struct Registration {
    cancel: CancellationToken,
    serve_task: JoinHandle<()>,
}

/// Owns the device-side lifecycle: one endpoint, one accept loop.
///
/// `start` and `stop` are both safe to call repeatedly and after partial
/// failure; the device is addressable to clients only between a fully
/// successful `start` and the next `stop`.
pub struct DeviceGateway {
    socket_path: PathBuf,
    registration: Mutex<Option<Registration>>,
}

impl DeviceGateway {
    pub fn new(socket_path: PathBuf) -> Self {
        DeviceGateway {
            socket_path,
            registration: Mutex::new(None),
        }
    }

    #[inline]
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Claim the endpoint address, then install the dispatch loop.
    ///
    /// If the second step fails the claimed address is released before the
    /// error returns, so no partial registration survives any exit path. A
    /// pre-existing file at the path fails the claim rather than being
    /// unlinked, since it may be another process's live endpoint.
    #[instrument(level = "info", skip_all, fields(path = %self.socket_path.display()))]
    pub async fn start(&self, binding: BindingSlot) -> Result<(), RegistrationError> {
        let mut registration = self.registration.lock().await;
        if registration.is_some() {
            debug!("gateway already started");
            return Ok(());
        }

        info!("claiming control endpoint");
        if self.socket_path.exists() {
            return Err(RegistrationError::AddressUnavailable {
                path: self.socket_path.clone(),
                reason: "path already exists".into(),
            });
        }
        let listener = UnixListener::bind(&self.socket_path)
            .map_err(|e| RegistrationError::address_unavailable(&self.socket_path, e))?;

        match self.install(listener, binding) {
            Ok(installed) => {
                *registration = Some(installed);
                info!("device addressable");
                Ok(())
            }
            Err(e) => {
                // Unwind the claim; the address must not leak.
                if let Err(unlink) = std::fs::remove_file(&self.socket_path) {
                    warn!(err = %unlink, "failed to release endpoint after partial start");
                }
                Err(e)
            }
        }
    }

    fn install(
        &self,
        listener: UnixListener,
        binding: BindingSlot,
    ) -> Result<Registration, RegistrationError> {
        // Control devices are world-accessible; permissions on the endpoint
        // stand in for the device node's mode bits.
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o666))
            .map_err(|e| RegistrationError::SpawnFailed(e.to_string()))?;
        let cancel = CancellationToken::new();
        let serve_task = tokio::spawn(accept_loop(listener, binding, cancel.child_token()));
        Ok(Registration { cancel, serve_task })
    }

    /// Tear down the dispatch loop and release the endpoint. No-op if never
    /// (or no longer) registered, so it is safe after a partial `start`.
    #[instrument(level = "info", skip_all, fields(path = %self.socket_path.display()))]
    pub async fn stop(&self) {
        let mut registration = self.registration.lock().await;
        match registration.take() {
            Some(installed) => {
                installed.cancel.cancel();
                if timeout(Duration::from_secs(2), installed.serve_task)
                    .await
                    .is_err()
                {
                    warn!("dispatch loop did not stop within 2s");
                }
                match std::fs::remove_file(&self.socket_path) {
                    Ok(()) => info!("released control endpoint"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(err = %e, "failed to release control endpoint"),
                }
            }
            None => debug!("stop on unregistered gateway"),
        }
    }
}

async fn accept_loop(listener: UnixListener, binding: BindingSlot, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let dispatcher = Dispatcher::new(binding.clone());
                    tokio::spawn(serve_session(stream, dispatcher, cancel.child_token()));
                }
                Err(e) => {
                    warn!(err = %e, "accept failed");
                }
            },
        }
    }
    debug!("accept loop stopped");
}

/// Serve one client session: read a frame, dispatch it, answer, repeat.
/// Requests from one session are therefore observed strictly in issue order.
async fn serve_session(
    mut stream: UnixStream,
    mut dispatcher: Dispatcher,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = read_frame(&mut stream) => frame,
        };
        match frame {
            Ok(FrameRead::Eof) => break,
            Ok(FrameRead::Frame(body)) => {
                let response = match ControlRequest::parse(&body) {
                    Ok(request) => dispatcher.handle(request).await,
                    Err(e) => {
                        // Framing is still intact, so answer and keep the
                        // session; nothing was mutated.
                        debug!(err = %e, "rejected control request");
                        ControlResponse::err(e.wire_code())
                    }
                };
                if let Err(e) = write_frame(&mut stream, &response).await {
                    debug!(err = %e, "session write failed");
                    break;
                }
            }
            Ok(FrameRead::Oversized { len }) => {
                // The body was never read; the stream cannot be resynced.
                warn!(len, "oversized frame, closing session");
                let refused = ProtocolError::OversizedFrame {
                    len,
                    max: MAX_FRAME_LEN,
                };
                let _ = write_frame(&mut stream, &ControlResponse::err(refused.wire_code())).await;
                break;
            }
            Err(e) => {
                debug!(err = %e, "session read failed");
                break;
            }
        }
    }
}
