use crate::shared::dns::errors::*;
use crate::shared::dns::header::*;
use crate::shared::dns::question::*;
use crate::shared::dns::record::*;
use crate::shared::dns::wire::*;
use crate::shared::dns::MAX_UDP_LEN_BYTES;

/// Represents a complete dns message. The [`Header`] counts must be
/// concordant with the [`Question`]s and [`Record`]s carried in the
/// other message sections.
#[derive(Debug, Clone)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Decode a dns [`Message`] from the provided bytes. Questions and
    /// records of unknown types are skipped without failing the whole
    /// message, any other malformation is reported as an error. We want
    /// to make sure no unsupported feature enters or exits the system.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Message, MessageErr> {
        let mut buffer = WireBuf::from_bytes(bytes);

        let header = match Header::decode_from_buf(&mut buffer) {
            Err(err) => return Err(MessageErr::HeaderErr(err)),
            Ok(header) => header,
        };
        if let Err(err) = header.is_supported() {
            return Err(MessageErr::HeaderErr(err));
        }

        let mut questions = Vec::with_capacity(header.questions_count as usize);
        let mut answers = Vec::with_capacity(header.answers_count as usize);
        let mut authorities = Vec::with_capacity(header.authorities_count as usize);
        let mut additionals = Vec::with_capacity(header.additionals_count as usize);

        for i in 0..header.questions_count as usize {
            match Question::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::QuestionErr(i, err)),
                Ok(v) => questions.push(v),
            };
        }
        for i in 0..header.answers_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AnswerErr(i, err)),
                Ok(v) => answers.push(v),
            };
        }
        for i in 0..header.authorities_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AuthorityErr(i, err)),
                Ok(v) => authorities.push(v),
            };
        }
        for i in 0..header.additionals_count as usize {
            match Record::decode_from_buf(&mut buffer) {
                Err(ParsingErr::UnknownType(_)) => continue,
                Err(err) => return Err(MessageErr::AdditionalErr(i, err)),
                Ok(v) => additionals.push(v),
            };
        }

        Ok(Message {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }

    /// Encode a dns [`Message`] to raw bytes. The section counts written
    /// in the header are taken from the section vectors themselves, which
    /// must match the header counts.
    pub fn encode_to_bytes(&self) -> Result<Vec<u8>, MessageErr> {
        debug_assert_eq!(self.header.questions_count as usize, self.questions.len());
        debug_assert_eq!(self.header.answers_count as usize, self.answers.len());
        debug_assert_eq!(self.header.authorities_count as usize, self.authorities.len());
        debug_assert_eq!(self.header.additionals_count as usize, self.additionals.len());

        let mut buffer = WireBuf::new();
        self.header.encode_to_buf(&mut buffer);

        for (i, question) in self.questions.iter().enumerate() {
            if let Err(err) = question.encode_to_buf(&mut buffer) {
                return Err(MessageErr::QuestionErr(i, err));
            }
        }
        for (i, record) in self.answers.iter().enumerate() {
            if let Err(err) = record.encode_to_buf(&mut buffer) {
                return Err(MessageErr::AnswerErr(i, err));
            }
        }
        for (i, record) in self.authorities.iter().enumerate() {
            if let Err(err) = record.encode_to_buf(&mut buffer) {
                return Err(MessageErr::AuthorityErr(i, err));
            }
        }
        for (i, record) in self.additionals.iter().enumerate() {
            if let Err(err) = record.encode_to_buf(&mut buffer) {
                return Err(MessageErr::AdditionalErr(i, err));
            }
        }

        Ok(buffer.into_vec())
    }

    /// Encode a dns [`Message`] for an UDP reply. If the encoded message
    /// exceeds the classic 512 bytes limit the record sections are dropped
    /// and the truncation bit is set, so clients can retry over TCP.
    pub fn encode_to_bytes_trunc(&self) -> Result<Vec<u8>, MessageErr> {
        let bytes = self.encode_to_bytes()?;
        if bytes.len() <= MAX_UDP_LEN_BYTES {
            return Ok(bytes);
        }

        let mut header = self.header.clone();
        header.truncated = true;
        header.answers_count = 0;
        header.authorities_count = 0;
        header.additionals_count = 0;
        let truncated = Message {
            header,
            questions: self.questions.clone(),
            answers: vec![],
            authorities: vec![],
            additionals: vec![],
        };
        truncated.encode_to_bytes()
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }
}
