use crate::prelude::*;

use {
    async_trait::async_trait,
    bytes::{Buf, BufMut, BytesMut},
    futures::{SinkExt, StreamExt},
    net2::TcpStreamExt,
    std::sync::atomic::{AtomicBool, AtomicU16, Ordering},
    std::time::Duration,
    tokio::net::TcpStream,
    tokio::sync::Mutex,
    tokio_util::codec::{Decoder, Encoder, Framed},
};

use crate::error::Result;
use crate::huawei::modbus::Transport;

const MBAP_HEADER_LEN: usize = 7;
const MAX_PDU_LEN: usize = 253;
const TCP_KEEPALIVE_SECS: u64 = 60; // TCP keepalive interval

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MbapFrame {
    pub transaction_id: u16,
    pub unit_id: u8,
    pub pdu: Vec<u8>,
}

/// Modbus-TCP framing: transaction id, protocol id (always 0), length of
/// what follows, unit id, then the PDU.
#[derive(Default)]
pub struct MbapCodec;

impl Decoder for MbapCodec {
    type Item = MbapFrame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<MbapFrame>, Self::Error> {
        if src.len() < MBAP_HEADER_LEN {
            return Ok(None);
        }

        // length counts the unit id plus the PDU
        let length = u16::from_be_bytes([src[4], src[5]]) as usize;
        if !(2..=MAX_PDU_LEN + 1).contains(&length) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid MBAP length {}", length),
            ));
        }

        let frame_len = MBAP_HEADER_LEN - 1 + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(frame_len);
        let transaction_id = frame.get_u16();
        let protocol_id = frame.get_u16();
        let _length = frame.get_u16();
        let unit_id = frame.get_u8();

        if protocol_id != 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected MBAP protocol id {}", protocol_id),
            ));
        }

        Ok(Some(MbapFrame {
            transaction_id,
            unit_id,
            pdu: frame.to_vec(),
        }))
    }
}

impl Encoder<MbapFrame> for MbapCodec {
    type Error = std::io::Error;

    fn encode(&mut self, frame: MbapFrame, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        if frame.pdu.is_empty() || frame.pdu.len() > MAX_PDU_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("PDU of {} bytes cannot be framed", frame.pdu.len()),
            ));
        }

        dst.reserve(MBAP_HEADER_LEN + frame.pdu.len());
        dst.put_u16(frame.transaction_id);
        dst.put_u16(0);
        dst.put_u16(frame.pdu.len() as u16 + 1);
        dst.put_u8(frame.unit_id);
        dst.put_slice(&frame.pdu);
        Ok(())
    }
}

type Connection = Framed<TcpStream, MbapCodec>;

pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    wait_after_connect: Duration,
    stream: Mutex<Option<Connection>>,
    connected: AtomicBool,
    // set by close(); no reconnects afterwards
    closed: AtomicBool,
    transaction_id: AtomicU16,
}

impl TcpTransport {
    pub async fn connect(host: &str, port: u16, timeout: Duration, wait_after_connect: Duration) -> Result<Self> {
        let transport = Self {
            host: host.to_string(),
            port,
            timeout,
            wait_after_connect,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            transaction_id: AtomicU16::new(0),
        };

        let connection = transport.open().await?;
        *transport.stream.lock().await = Some(connection);

        Ok(transport)
    }

    async fn open(&self) -> Result<Connection> {
        info!("connecting to {}:{}", self.host, self.port);

        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect((self.host.as_str(), self.port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(Error::Connection(format!(
                    "could not connect to {}:{}: {}",
                    self.host, self.port, err
                )))
            }
            Err(_) => {
                return Err(Error::Connection(format!(
                    "connection to {}:{} timed out after {:?}",
                    self.host, self.port, self.timeout
                )))
            }
        };

        let std_stream = stream.into_std()?;
        if let Err(err) = std_stream.set_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS))) {
            warn!("Failed to set TCP keepalive: {}", err);
        }
        let stream = TcpStream::from_std(std_stream)?;
        if let Err(err) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", err);
        }

        // the device drops requests sent right after the connection is made
        debug!("waiting {:?} after connecting", self.wait_after_connect);
        tokio::time::sleep(self.wait_after_connect).await;

        self.connected.store(true, Ordering::SeqCst);
        info!("connected to {}:{}", self.host, self.port);

        Ok(Framed::new(stream, MbapCodec))
    }

    async fn exchange(&self, connection: &mut Connection, frame: MbapFrame) -> Result<Vec<u8>> {
        let transaction_id = frame.transaction_id;

        match tokio::time::timeout(self.timeout, connection.send(frame)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Connection(format!("write timed out after {:?}", self.timeout))),
        }

        loop {
            match tokio::time::timeout(self.timeout, connection.next()).await {
                Ok(Some(Ok(reply))) if reply.transaction_id == transaction_id => return Ok(reply.pdu),
                Ok(Some(Ok(reply))) => {
                    debug!(
                        "ignoring reply for transaction {} while waiting for {}",
                        reply.transaction_id, transaction_id
                    );
                }
                Ok(Some(Err(err))) => return Err(err.into()),
                Ok(None) => return Err(Error::Connection("connection closed by the device".to_string())),
                Err(_) => {
                    return Err(Error::Connection(format!(
                        "no reply to transaction {} within {:?}",
                        transaction_id, self.timeout
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, slave: u8, pdu: &[u8]) -> Result<Vec<u8>> {
        let mut stream = self.stream.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Connection("transport closed".to_string()));
        }
        if stream.is_none() {
            *stream = Some(self.open().await?);
        }
        let Some(connection) = stream.as_mut() else {
            return Err(Error::Connection("not connected".to_string()));
        };

        let frame = MbapFrame {
            transaction_id: self.transaction_id.fetch_add(1, Ordering::SeqCst),
            unit_id: slave,
            pdu: pdu.to_vec(),
        };

        let result = self.exchange(connection, frame).await;
        if let Err(err) = &result {
            warn!("dropping connection to {}:{}: {}", self.host, self.port, err);
            *stream = None;
            self.connected.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn close(&self) {
        let mut stream = self.stream.lock().await;
        self.closed.store(true, Ordering::SeqCst);

        if let Some(mut connection) = stream.take() {
            if let Err(err) = connection.close().await {
                debug!("error while closing connection: {}", err);
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("disconnected from {}:{}", self.host, self.port);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let mut buf = BytesMut::new();
        MbapCodec
            .encode(
                MbapFrame {
                    transaction_id: 7,
                    unit_id: 1,
                    pdu: vec![0x03, 0x75, 0x30, 0x00, 0x0f],
                },
                &mut buf,
            )
            .unwrap();
        assert_eq!(
            buf.to_vec(),
            vec![0, 7, 0, 0, 0, 6, 1, 0x03, 0x75, 0x30, 0x00, 0x0f]
        );

        let decoded = MbapCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.transaction_id, 7);
        assert_eq!(decoded.pdu, vec![0x03, 0x75, 0x30, 0x00, 0x0f]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits() {
        let mut buf = BytesMut::from(&[0u8, 1, 0, 0, 0, 4, 1, 0x03][..]);
        assert_eq!(MbapCodec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(&[2, 0, 1]);
        assert_eq!(MbapCodec.decode(&mut buf).unwrap().unwrap().pdu, vec![0x03, 2, 0, 1]);
    }
}
