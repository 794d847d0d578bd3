use crate::shared::dns::class::*;
use crate::shared::dns::errors::*;
use crate::shared::dns::name::*;
use crate::shared::dns::types::*;
use crate::shared::dns::wire::*;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str;

/// Records present in the answer, authority and additional sections of
/// dns messages. A record refers to a specific node of the name system,
/// describing one resource of that node. Only the types listed in
/// [RecordType] have a variant here, everything else is skipped at
/// decoding time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    A {
        node: Name,
        class: Class,
        ttl: u32,
        address: Ipv4Addr,
    },
    AAAA {
        node: Name,
        class: Class,
        ttl: u32,
        address: Ipv6Addr,
    },
    NS {
        node: Name,
        class: Class,
        ttl: u32,
        name: Name,
    },
    CNAME {
        node: Name,
        class: Class,
        ttl: u32,
        name: Name,
    },
    SOA {
        node: Name,
        class: Class,
        ttl: u32,
        ns_name: Name,
        mail_name: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    PTR {
        node: Name,
        class: Class,
        ttl: u32,
        name: Name,
    },
    MX {
        node: Name,
        class: Class,
        ttl: u32,
        priority: u16,
        name: Name,
    },
    TXT {
        node: Name,
        class: Class,
        ttl: u32,
        txts: Vec<String>,
    },
}

impl Record {
    /// Decode a dns message [`Record`] from the bytes read from the passed
    /// buffer. Unknown types still cause the bytes of that record to be
    /// consumed (and an error is returned as usual), so decoding of the
    /// following records is not compromised.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Record, ParsingErr> {
        let node = Name::decode_from_buf(buffer)?;
        let rec_type = decode_record_type(buffer)?;
        let class = decode_class(check_end(buffer.read_u16())?)?;
        let ttl = check_end(buffer.read_u32())?;
        let data_len = check_end(buffer.read_u16())?;

        let data_start = buffer.pos();
        let record = match rec_type {
            RecordType::A => Record::A {
                node,
                class,
                ttl,
                address: decode_a_data(buffer, data_len)?,
            },
            RecordType::AAAA => Record::AAAA {
                node,
                class,
                ttl,
                address: decode_aaaa_data(buffer, data_len)?,
            },
            RecordType::NS => Record::NS {
                node,
                class,
                ttl,
                name: Name::decode_from_buf(buffer)?,
            },
            RecordType::CNAME => Record::CNAME {
                node,
                class,
                ttl,
                name: Name::decode_from_buf(buffer)?,
            },
            RecordType::PTR => Record::PTR {
                node,
                class,
                ttl,
                name: Name::decode_from_buf(buffer)?,
            },
            RecordType::MX => Record::MX {
                node,
                class,
                ttl,
                priority: check_end(buffer.read_u16())?,
                name: Name::decode_from_buf(buffer)?,
            },
            RecordType::TXT => Record::TXT {
                node,
                class,
                ttl,
                txts: decode_txt_data(buffer, data_len)?,
            },
            RecordType::SOA => {
                let ns_name = Name::decode_from_buf(buffer)?;
                let mail_name = Name::decode_from_buf(buffer)?;
                let serial = check_end(buffer.read_u32())?;
                let refresh = check_end(buffer.read_u32())?;
                let retry = check_end(buffer.read_u32())?;
                let expire = check_end(buffer.read_u32())?;
                let minimum = check_end(buffer.read_u32())?;
                Record::SOA {
                    node,
                    class,
                    ttl,
                    ns_name,
                    mail_name,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                }
            }
        };

        if buffer.pos() - data_start != data_len as usize {
            return Err(ParsingErr::DataLenMismatch);
        }
        Ok(record)
    }

    /// Encode a dns message [`Record`] to raw bytes, writing them into the
    /// provided buffer. The data length field is computed from the encoded
    /// record data. Compression is never emitted.
    pub fn encode_to_buf(&self, buffer: &mut WireBuf) -> Result<(), ParsingErr> {
        assert!(matches!(self.class(), Class::IN));
        buffer.write_bytes(&self.node().encode());
        buffer.write_u16(self.record_type().to_num());
        buffer.write_u16(self.class().to_num());
        buffer.write_u32(self.ttl());

        let data = self.encode_data()?;
        buffer.write_u16(data.len() as u16);
        buffer.write_bytes(&data);
        Ok(())
    }

    // Encode the record data section alone.
    fn encode_data(&self) -> Result<Vec<u8>, ParsingErr> {
        let mut data = vec![];
        match self {
            Record::A { address, .. } => data.extend(address.octets()),
            Record::AAAA { address, .. } => data.extend(address.octets()),
            Record::NS { name, .. } => data.extend(name.encode()),
            Record::CNAME { name, .. } => data.extend(name.encode()),
            Record::PTR { name, .. } => data.extend(name.encode()),
            Record::MX { priority, name, .. } => {
                data.extend((*priority).to_be_bytes());
                data.extend(name.encode());
            }
            Record::TXT { txts, .. } => {
                for txt in txts {
                    data.extend(encode_character_string(txt)?);
                }
            }
            Record::SOA {
                ns_name,
                mail_name,
                serial,
                refresh,
                retry,
                expire,
                minimum,
                ..
            } => {
                data.extend(ns_name.encode());
                data.extend(mail_name.encode());
                for n in [serial, refresh, retry, expire, minimum] {
                    data.extend((*n).to_be_bytes());
                }
            }
        }
        Ok(data)
    }
}

impl Record {
    /// Returns the node (owner name) of the [`Record`].
    pub fn node(&self) -> &Name {
        match self {
            Record::A { node, .. } => node,
            Record::AAAA { node, .. } => node,
            Record::NS { node, .. } => node,
            Record::CNAME { node, .. } => node,
            Record::SOA { node, .. } => node,
            Record::PTR { node, .. } => node,
            Record::MX { node, .. } => node,
            Record::TXT { node, .. } => node,
        }
    }

    /// Returns the class of the [`Record`].
    pub fn class(&self) -> Class {
        match self {
            Record::A { class, .. } => *class,
            Record::AAAA { class, .. } => *class,
            Record::NS { class, .. } => *class,
            Record::CNAME { class, .. } => *class,
            Record::SOA { class, .. } => *class,
            Record::PTR { class, .. } => *class,
            Record::MX { class, .. } => *class,
            Record::TXT { class, .. } => *class,
        }
    }

    /// Returns the ttl of the [`Record`].
    pub fn ttl(&self) -> u32 {
        match self {
            Record::A { ttl, .. } => *ttl,
            Record::AAAA { ttl, .. } => *ttl,
            Record::NS { ttl, .. } => *ttl,
            Record::CNAME { ttl, .. } => *ttl,
            Record::SOA { ttl, .. } => *ttl,
            Record::PTR { ttl, .. } => *ttl,
            Record::MX { ttl, .. } => *ttl,
            Record::TXT { ttl, .. } => *ttl,
        }
    }

    /// Returns the [RecordType] variant corresponding with the [`Record`].
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::A { .. } => RecordType::A,
            Record::AAAA { .. } => RecordType::AAAA,
            Record::NS { .. } => RecordType::NS,
            Record::CNAME { .. } => RecordType::CNAME,
            Record::SOA { .. } => RecordType::SOA,
            Record::PTR { .. } => RecordType::PTR,
            Record::MX { .. } => RecordType::MX,
            Record::TXT { .. } => RecordType::TXT,
        }
    }

    /// Returns the nameserver carried by a NS record.
    /// Panics if the [`Record`] is not of type NS.
    pub fn ns_data(&self) -> &Name {
        match self {
            Record::NS { name, .. } => name,
            _ => panic!("ns_data on non-NS record"),
        }
    }

    /// Returns the primary nameserver carried by a SOA record.
    /// Panics if the [`Record`] is not of type SOA.
    pub fn soa_mname(&self) -> &Name {
        match self {
            Record::SOA { ns_name, .. } => ns_name,
            _ => panic!("soa_mname on non-SOA record"),
        }
    }
}

fn decode_record_type(buffer: &mut WireBuf) -> Result<RecordType, ParsingErr> {
    match RecordType::from_num(check_end(buffer.read_u16())?) {
        Ok(v) => Ok(v),
        Err(n) => {
            // Unknown type: consume the whole record so the caller
            // can skip it and keep decoding the message.
            check_end(buffer.read_u16())?;
            check_end(buffer.read_u32())?;
            let data_len = check_end(buffer.read_u16())?;
            check_end(buffer.read_bytes(data_len as usize))?;
            Err(ParsingErr::UnknownType(n))
        }
    }
}

fn decode_class(n: u16) -> Result<Class, ParsingErr> {
    match Class::from_num(n) {
        Ok(v) if !v.is_supported() => Err(ParsingErr::UnsupportedClass(v)),
        Err(n) => Err(ParsingErr::UnknownClass(n)),
        Ok(v) => Ok(v),
    }
}

fn decode_a_data(buffer: &mut WireBuf, data_len: u16) -> Result<Ipv4Addr, ParsingErr> {
    if data_len != 4 {
        return Err(ParsingErr::DataLenMismatch);
    }
    let bytes = check_end(buffer.read_bytes(4))?;
    let octets: [u8; 4] = bytes.try_into().unwrap();
    Ok(Ipv4Addr::from(octets))
}

fn decode_aaaa_data(buffer: &mut WireBuf, data_len: u16) -> Result<Ipv6Addr, ParsingErr> {
    if data_len != 16 {
        return Err(ParsingErr::DataLenMismatch);
    }
    let bytes = check_end(buffer.read_bytes(16))?;
    let octets: [u8; 16] = bytes.try_into().unwrap();
    Ok(Ipv6Addr::from(octets))
}

fn decode_txt_data(buffer: &mut WireBuf, data_len: u16) -> Result<Vec<String>, ParsingErr> {
    let mut strings = vec![];
    let mut read: usize = 0;
    while read < data_len as usize {
        let len = check_end(buffer.read_u8())? as usize;
        if read + len + 1 > data_len as usize {
            return Err(ParsingErr::DataLenMismatch);
        }
        let str_bytes = check_end(buffer.read_bytes(len))?;
        match str::from_utf8(&str_bytes) {
            Err(_) => return Err(ParsingErr::StringCharErr("not utf-8".to_string())),
            Ok(s) => strings.push(s.to_string()),
        }
        read += len + 1;
    }
    Ok(strings)
}

fn encode_character_string(string: &str) -> Result<Vec<u8>, ParsingErr> {
    if string.len() > 255 {
        return Err(ParsingErr::StringCharErr("string len > 255".to_string()));
    }
    let mut bytes = Vec::with_capacity(string.len() + 1);
    bytes.push(string.len() as u8);
    bytes.extend(string.as_bytes());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_string(s).unwrap()
    }

    fn round_trip(record: Record) -> Record {
        let mut buffer = WireBuf::new();
        record.encode_to_buf(&mut buffer).unwrap();
        let mut buffer = WireBuf::from_bytes(&buffer.into_vec());
        Record::decode_from_buf(&mut buffer).unwrap()
    }

    #[test]
    fn a_record_round_trip() {
        let record = Record::A {
            node: name("host.dyndns.org"),
            class: Class::IN,
            ttl: 86400,
            address: Ipv4Addr::new(10, 1, 2, 3),
        };
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn soa_record_round_trip() {
        let record = Record::SOA {
            node: name("dyndns.org"),
            class: Class::IN,
            ttl: 86400,
            ns_name: name("ns.sinkhole.example.com"),
            mail_name: name("hostmaster.sinkhole.example.com"),
            serial: 42,
            refresh: 10800,
            retry: 3600,
            expire: 604800,
            minimum: 3600,
        };
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn txt_record_round_trip() {
        let record = Record::TXT {
            node: name("info.example.com"),
            class: Class::IN,
            ttl: 300,
            txts: vec!["sinkholed".to_string(), "contact admin".to_string()],
        };
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn unknown_type_is_consumed() {
        // A record with type 99 and 3 bytes of data, followed by a u16 marker.
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&name("x.example.com").encode());
        buffer.write_u16(99);
        buffer.write_u16(Class::IN.to_num());
        buffer.write_u32(60);
        buffer.write_u16(3);
        buffer.write_bytes(&[1, 2, 3]);
        buffer.write_u16(0xabcd);

        let mut buffer = WireBuf::from_bytes(&buffer.into_vec());
        assert!(matches!(
            Record::decode_from_buf(&mut buffer),
            Err(ParsingErr::UnknownType(99))
        ));
        assert_eq!(buffer.read_u16(), Some(0xabcd));
    }

    #[test]
    fn data_len_mismatch_detected() {
        let mut buffer = WireBuf::new();
        buffer.write_bytes(&name("x.example.com").encode());
        buffer.write_u16(RecordType::NS.to_num());
        buffer.write_u16(Class::IN.to_num());
        buffer.write_u32(60);
        buffer.write_u16(100); // wrong data len
        buffer.write_bytes(&name("ns.example.com").encode());
        buffer.write_bytes(&[0; 84]);

        let mut buffer = WireBuf::from_bytes(&buffer.into_vec());
        assert!(matches!(
            Record::decode_from_buf(&mut buffer),
            Err(ParsingErr::DataLenMismatch)
        ));
    }
}
