use crate::shared::dns::errors::*;
use crate::shared::dns::wire::*;
use rand::Rng;

/// Header of dns messages. The twelve header bytes are decoded into
/// explicit fields, with the sixteen flag bits unpacked from the second
/// word. The `Default` trait generates an empty header with a random id.
#[derive(Debug, Clone)]
pub struct Header {
    pub id: u16,
    pub query_resp: bool,
    pub op_code: OpCode,
    pub auth_answer: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub resp_code: RespCode,
    pub questions_count: u16,
    pub answers_count: u16,
    pub authorities_count: u16,
    pub additionals_count: u16,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            id: rand::thread_rng().gen::<u16>(),
            query_resp: false,
            op_code: OpCode::Query,
            auth_answer: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: false,
            authentic_data: false,
            checking_disabled: false,
            resp_code: RespCode::NoError,
            questions_count: 0,
            answers_count: 0,
            authorities_count: 0,
            additionals_count: 0,
        }
    }
}

impl Header {
    /// Decode a dns message [`Header`] from the bytes read from the provided
    /// buffer. Unknown op/resp codes are detected and reported as errors.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Header, ParsingErr> {
        let id = check_end(buffer.read_u16())?;
        let flags = check_end(buffer.read_u16())?;
        let op_code = decode_op_code(((flags >> 11) & 0xf) as u8, true)?;
        let resp_code = match RespCode::from_num((flags & 0xf) as u8) {
            Err(n) => return Err(ParsingErr::UnknownRespCode(n)),
            Ok(v) => v,
        };
        let questions_count = check_end(buffer.read_u16())?;
        let answers_count = check_end(buffer.read_u16())?;
        let authorities_count = check_end(buffer.read_u16())?;
        let additionals_count = check_end(buffer.read_u16())?;
        Ok(Header {
            id,
            query_resp: flags & (1 << 15) != 0,
            op_code,
            auth_answer: flags & (1 << 10) != 0,
            truncated: flags & (1 << 9) != 0,
            recursion_desired: flags & (1 << 8) != 0,
            recursion_available: flags & (1 << 7) != 0,
            z: flags & (1 << 6) != 0,
            authentic_data: flags & (1 << 5) != 0,
            checking_disabled: flags & (1 << 4) != 0,
            resp_code,
            questions_count,
            answers_count,
            authorities_count,
            additionals_count,
        })
    }

    /// Decode a dns message [`Header`] from the passed bytes slice. It is a
    /// wrapper around [Header::decode_from_buf] method which needs a buffer.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Header, ParsingErr> {
        let mut buffer = WireBuf::from_bytes(bytes);
        Header::decode_from_buf(&mut buffer)
    }

    /// Encode a dns [`Header`] to raw bytes, writing them into the provided
    /// buffer. The function panics if some unsupported op codes are provided
    /// (this helps maintaining invariants about supported features).
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) {
        assert!(self.op_code.is_supported());
        let mut flags: u16 = 0;
        flags |= (self.query_resp as u16) << 15;
        flags |= (self.op_code.to_num() as u16) << 11;
        flags |= (self.auth_answer as u16) << 10;
        flags |= (self.truncated as u16) << 9;
        flags |= (self.recursion_desired as u16) << 8;
        flags |= (self.recursion_available as u16) << 7;
        flags |= (self.z as u16) << 6;
        flags |= (self.authentic_data as u16) << 5;
        flags |= (self.checking_disabled as u16) << 4;
        flags |= self.resp_code.to_num() as u16;
        buffer.write_u16(self.id);
        buffer.write_u16(flags);
        buffer.write_u16(self.questions_count);
        buffer.write_u16(self.answers_count);
        buffer.write_u16(self.authorities_count);
        buffer.write_u16(self.additionals_count);
    }

    /// Determine if a [`Header`] contains values supported by the server.
    pub fn is_supported(&self) -> Result<(), ParsingErr> {
        decode_op_code(self.op_code.to_num(), false)?;
        Ok(())
    }

    /// Tells if a [`Header`] represents a request.
    pub fn is_request(&self) -> bool {
        !self.query_resp
    }
}

fn decode_op_code(op_code: u8, allow_unsupported: bool) -> Result<OpCode, ParsingErr> {
    let op_code = match OpCode::from_num(op_code) {
        Err(n) => return Err(ParsingErr::UnknownOpCode(n)),
        Ok(v) => v,
    };
    if !op_code.is_supported() && !allow_unsupported {
        Err(ParsingErr::UnsupportedOpCode(op_code))
    } else {
        Ok(op_code)
    }
}

/// The response code present in the [`Header`], used to inform the
/// client about the outcome of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
}

impl RespCode {
    pub fn from_num(n: u8) -> Result<Self, u8> {
        match n {
            0 => Ok(RespCode::NoError),
            1 => Ok(RespCode::FormErr),
            2 => Ok(RespCode::ServFail),
            3 => Ok(RespCode::NxDomain),
            4 => Ok(RespCode::NotImp),
            5 => Ok(RespCode::Refused),
            _ => Err(n),
        }
    }

    pub fn to_num(self) -> u8 {
        match self {
            RespCode::NoError => 0,
            RespCode::FormErr => 1,
            RespCode::ServFail => 2,
            RespCode::NxDomain => 3,
            RespCode::NotImp => 4,
            RespCode::Refused => 5,
        }
    }
}

/// The operation code present in the header, specifying the type of
/// operation the server should perform on behalf of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Query,
    IQuery,
    Status,
}

impl OpCode {
    /// Try to generate a [`OpCode`] from its raw number representation.
    pub fn from_num(n: u8) -> Result<Self, u8> {
        match n {
            0 => Ok(OpCode::Query),
            1 => Ok(OpCode::IQuery),
            2 => Ok(OpCode::Status),
            n => Err(n),
        }
    }

    /// Convert a [`OpCode`] to its raw number representation.
    pub fn to_num(self) -> u8 {
        match self {
            OpCode::Query => 0,
            OpCode::IQuery => 1,
            OpCode::Status => 2,
        }
    }

    /// Only standard queries are served.
    pub fn is_supported(self) -> bool {
        matches!(self, OpCode::Query)
    }
}
