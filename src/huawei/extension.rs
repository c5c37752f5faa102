//! Requests and responses carried by the private function code 0x41.

use crate::prelude::*;

use bytes::{BufMut, BytesMut};
use enum_dispatch::enum_dispatch;
use nom::IResult;
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Result;
use crate::huawei::modbus::Request;

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SubFunction {
    StartUpload = 0x05,
    UploadFrame = 0x06,
    CompleteUpload = 0x0C,
    LoginChallenge = 36,
    Login = 37,
}

#[enum_dispatch]
pub trait PrivateRequestCommon {
    fn sub_function(&self) -> SubFunction;
    fn content(&self) -> Vec<u8>;

    fn request(&self) -> Request {
        Request::Private {
            sub_function: self.sub_function().into(),
            content: self.content(),
        }
    }
}

#[enum_dispatch(PrivateRequestCommon)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrivateRequest {
    StartUpload(StartUpload),
    UploadFrame(UploadFrame),
    CompleteUpload(CompleteUpload),
    LoginChallenge(LoginChallenge),
    Login(Login),
}

// {{{ file upload
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StartUpload {
    pub file_type: u8,
    pub customized_data: Vec<u8>,
}

impl PrivateRequestCommon for StartUpload {
    fn sub_function(&self) -> SubFunction {
        SubFunction::StartUpload
    }

    fn content(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(1 + self.customized_data.len() as u8);
        buf.put_u8(self.file_type);
        buf.put_slice(&self.customized_data);
        buf.to_vec()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadFrame {
    pub file_type: u8,
    pub frame_no: u16,
}

impl PrivateRequestCommon for UploadFrame {
    fn sub_function(&self) -> SubFunction {
        SubFunction::UploadFrame
    }

    fn content(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(3);
        buf.put_u8(self.file_type);
        buf.put_u16(self.frame_no);
        buf.to_vec()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompleteUpload {
    pub file_type: u8,
}

impl PrivateRequestCommon for CompleteUpload {
    fn sub_function(&self) -> SubFunction {
        SubFunction::CompleteUpload
    }

    fn content(&self) -> Vec<u8> {
        vec![1, self.file_type]
    }
}

fn remaining(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    Ok((&input[input.len()..], input.to_vec()))
}

#[derive(Clone, Debug, Eq, PartialEq, Nom)]
#[nom(BigEndian)]
pub struct StartUploadResponse {
    pub data_length: u8,
    pub file_type: u8,
    pub file_length: u32,
    pub frame_length: u8,
    #[nom(Parse = "remaining")]
    pub customized_data: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq, Nom)]
#[nom(BigEndian)]
pub struct UploadFrameResponse {
    pub data_length: u8,
    pub file_type: u8,
    pub frame_no: u16,
    #[nom(Parse = "remaining")]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq, Nom)]
#[nom(BigEndian)]
pub struct CompleteUploadResponse {
    pub data_length: u8,
    pub file_type: u8,
    // Modbus CRC16 of the whole file
    pub crc: u16,
}

/// Parses the content of a private response, after the sub-function byte.
pub fn parse_response<'a, T>(content: &'a [u8], what: &str) -> Result<T>
where
    T: Parse<&'a [u8]>,
{
    T::parse(content)
        .map(|(_, response)| response)
        .map_err(|err| Error::read(format!("could not parse {} response {:02x?}: {}", what, content, err)))
}
// }}}

// {{{ login
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct LoginChallenge;

impl PrivateRequestCommon for LoginChallenge {
    fn sub_function(&self) -> SubFunction {
        SubFunction::LoginChallenge
    }

    fn content(&self) -> Vec<u8> {
        vec![1, 0]
    }
}

pub const CHALLENGE_LEN: usize = 16;
const CHALLENGE_MARKER: u8 = 0x11;

/// Extracts the inverter challenge from a login-challenge response.
pub fn inverter_challenge(content: &[u8]) -> Result<[u8; CHALLENGE_LEN]> {
    match content {
        [CHALLENGE_MARKER, challenge @ ..] if challenge.len() >= CHALLENGE_LEN => {
            let mut result = [0; CHALLENGE_LEN];
            result.copy_from_slice(&challenge[..CHALLENGE_LEN]);
            Ok(result)
        }
        _ => Err(Error::read(format!("unexpected login challenge response {:02x?}", content))),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Login {
    pub client_challenge: [u8; CHALLENGE_LEN],
    pub username: String,
    pub mac: Vec<u8>,
}

impl PrivateRequestCommon for Login {
    fn sub_function(&self) -> SubFunction {
        SubFunction::Login
    }

    fn content(&self) -> Vec<u8> {
        let username = self.username.as_bytes();
        let mut buf = BytesMut::new();
        buf.put_u8((CHALLENGE_LEN + 1 + username.len() + 1 + self.mac.len()) as u8);
        buf.put_slice(&self.client_challenge);
        buf.put_u8(username.len() as u8);
        buf.put_slice(username);
        buf.put_u8(self.mac.len() as u8);
        buf.put_slice(&self.mac);
        buf.to_vec()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoginResponse {
    pub accepted: bool,
    pub inverter_mac: Vec<u8>,
}

impl LoginResponse {
    pub fn parse(content: &[u8]) -> Result<Self> {
        let Some(&status) = content.get(1) else {
            return Err(Error::read(format!("truncated login response {:02x?}", content)));
        };

        let inverter_mac = match content.get(2) {
            Some(&len) => content.iter().skip(3).take(len as usize).copied().collect(),
            None => Vec::new(),
        };

        Ok(Self {
            accepted: status == 0,
            inverter_mac,
        })
    }
}
// }}}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_upload_with_custom_data() {
        let request = PrivateRequest::from(StartUpload {
            file_type: 0x44,
            customized_data: vec![0xaa, 0xbb],
        });
        assert_eq!(
            request.request(),
            Request::Private {
                sub_function: 0x05,
                content: vec![3, 0x44, 0xaa, 0xbb]
            }
        );
    }

    #[test]
    fn upload_frame_request() {
        let request = UploadFrame {
            file_type: 0x45,
            frame_no: 0x0102,
        };
        assert_eq!(request.content(), vec![3, 0x45, 1, 2]);
    }

    #[test]
    fn start_upload_response() {
        let response: StartUploadResponse =
            parse_response(&[6, 0x45, 0, 0, 1, 0, 0xf0, 0xde], "start upload").unwrap();
        assert_eq!(response.file_type, 0x45);
        assert_eq!(response.file_length, 256);
        assert_eq!(response.frame_length, 0xf0);
        assert_eq!(response.customized_data, vec![0xde]);

        assert!(parse_response::<StartUploadResponse>(&[6, 0x45, 0], "start upload").is_err());
    }

    #[test]
    fn challenge_needs_marker() {
        let mut content = vec![0x11];
        content.extend(1..=16);
        assert_eq!(inverter_challenge(&content).unwrap()[0], 1);
        assert!(inverter_challenge(&[0x10; 17]).is_err());
        assert!(inverter_challenge(&[0x11; 5]).is_err());
    }

    #[test]
    fn login_payload() {
        let login = Login {
            client_challenge: [7; 16],
            username: "installer".to_string(),
            mac: vec![9; 32],
        };
        let content = login.content();
        assert_eq!(content[0] as usize, 16 + 1 + 9 + 1 + 32);
        assert_eq!(&content[1..17], &[7; 16]);
        assert_eq!(content[17], 9);
        assert_eq!(&content[18..27], b"installer");
        assert_eq!(content[27], 32);
        assert_eq!(content.len(), 1 + 16 + 1 + 9 + 1 + 32);
    }

    #[test]
    fn login_response_status() {
        let response = LoginResponse::parse(&[0, 0, 2, 0xab, 0xcd]).unwrap();
        assert!(response.accepted);
        assert_eq!(response.inverter_mac, vec![0xab, 0xcd]);
        assert!(!LoginResponse::parse(&[0, 1]).unwrap().accepted);
    }
}
