use crate::shared::dns::class::*;
use crate::shared::dns::errors::*;
use crate::shared::dns::name::*;
use crate::shared::dns::types::*;
use crate::shared::dns::wire::*;

/// Questions present in the question section of dns messages. They name
/// a node of the name system and the type of records asked for. Class
/// support is limited to the internet class.
#[derive(Debug, Clone)]
pub struct Question {
    pub node: Name,
    pub record_type: RecordType,
    pub class: Class,
}

impl Question {
    /// Decode a dns message [`Question`] from the bytes read from the passed
    /// buffer. Unknown types still cause the bytes of the question to be
    /// consumed (and an error is returned as usual).
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Question, ParsingErr> {
        let node = Name::decode_from_buf(buffer)?;
        let record_type = decode_record_type(buffer)?;
        let class = decode_class(check_end(buffer.read_u16())?)?;
        Ok(Question { node, record_type, class })
    }

    /// Encode a dns message [`Question`] to raw bytes, writing them into
    /// the provided buffer.
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) -> Result<(), ParsingErr> {
        assert!(self.class.is_supported());
        buffer.write_bytes(&self.node.encode());
        buffer.write_u16(self.record_type.to_num());
        buffer.write_u16(self.class.to_num());
        Ok(())
    }
}

fn decode_record_type(buffer: &mut WireBuf) -> Result<RecordType, ParsingErr> {
    match RecordType::from_num(check_end(buffer.read_u16())?) {
        Ok(v) => Ok(v),
        Err(n) => {
            check_end(buffer.read_u16())?;
            Err(ParsingErr::UnknownType(n))
        }
    }
}

fn decode_class(cl: u16) -> Result<Class, ParsingErr> {
    match Class::from_num(cl) {
        Err(c) => Err(ParsingErr::UnknownClass(c)),
        Ok(c) if !c.is_supported() => Err(ParsingErr::UnsupportedClass(c)),
        Ok(c) => Ok(c),
    }
}
