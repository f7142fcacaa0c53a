//! Minimal TCP client speaking the bridge's JSON protocol.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::Value;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BridgeClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl BridgeClient {
    pub fn connect(address: SocketAddr) -> Result<Self, String> {
        let stream = TcpStream::connect(address).map_err(|error| error.to_string())?;
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|error| error.to_string())?;
        let reader = stream.try_clone().map_err(|error| error.to_string())?;
        Ok(Self {
            writer: stream,
            reader: BufReader::new(reader),
        })
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
            .map_err(|error| error.to_string())
    }

    pub fn send(&mut self, document: &Value) -> Result<(), String> {
        let bytes = serde_json::to_vec(document).map_err(|error| error.to_string())?;
        self.send_raw(&bytes)
    }

    /// Reads one newline-terminated response document.
    pub fn receive(&mut self) -> Result<Value, String> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|error| error.to_string())?;
        if read == 0 {
            return Err("connection closed before a response arrived".to_owned());
        }
        serde_json::from_str(&line).map_err(|error| format!("bad response {line:?}: {error}"))
    }

    /// Returns `true` once the bridge has closed its end.
    pub fn is_closed(&mut self) -> bool {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => true,
            Err(error) => error.kind() == ErrorKind::ConnectionReset,
            Ok(_) => false,
        }
    }

    pub fn request(&mut self, document: &Value) -> Result<Value, String> {
        self.send(document)?;
        self.receive()
    }
}
