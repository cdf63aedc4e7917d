// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod error;
mod util;

use cid::Cid;
pub use error::*;
use futures::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use fvm_ipld_encoding::{from_slice, to_vec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use util::{ld_read, ld_write, read_node, varint_len};

/// On-disk length of a CAR header carrying exactly one CIDv1 root with a
/// 256-bit multihash: a one-byte varint length prefix followed by the 60-byte
/// CBOR header. Used as the fixed per-archive overhead in size accounting.
pub const SINGLE_ROOT_HEADER_LEN: u64 = 61;

/// CAR file header
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CarHeader {
    pub roots: Vec<Cid>,
    pub version: u64,
}

impl CarHeader {
    /// Creates a new CAR file header
    pub fn new(roots: Vec<Cid>, version: u64) -> Self {
        Self { roots, version }
    }
}

impl From<Vec<Cid>> for CarHeader {
    fn from(roots: Vec<Cid>) -> Self {
        Self { roots, version: 1 }
    }
}

/// IPLD Block
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

/// Parses and validates the leading header section, returning it along with
/// the number of bytes it occupies on disk.
async fn read_header<R>(reader: &mut R) -> Result<(CarHeader, u64), Error>
where
    R: AsyncRead + Send + Unpin,
{
    let buf = ld_read(reader)
        .await?
        .ok_or_else(|| Error::ParsingError("failed to parse uvarint for header".to_string()))?;
    let header: CarHeader = from_slice(&buf).map_err(|e| Error::ParsingError(e.to_string()))?;
    if header.roots.is_empty() {
        return Err(Error::ParsingError("empty CAR file".to_owned()));
    }
    if header.version != 1 {
        return Err(Error::InvalidFile("CAR file version must be 1".to_owned()));
    }
    let len = buf.len() as u64;
    Ok((header, varint_len(len) + len))
}

/// Writes a CAR file block by block in an append-only stream.
pub struct CarWriter<W> {
    writer: W,
}

impl<W> CarWriter<W>
where
    W: AsyncWrite + Send + Unpin,
{
    /// Writes the header declaring `roots` and returns the opened writer.
    pub async fn new(mut writer: W, roots: Vec<Cid>) -> Result<Self, Error> {
        let header = CarHeader::from(roots);
        let header_bytes = to_vec(&header)?;
        ld_write(&mut writer, &header_bytes).await?;
        Ok(CarWriter { writer })
    }

    /// Appends one `(cid, data)` section.
    pub async fn write(&mut self, cid: &Cid, data: &[u8]) -> Result<(), Error> {
        ld_write(&mut self.writer, &[cid.to_bytes(), data.to_vec()].concat()).await
    }

    pub async fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Reads CAR files from a buffered reader, one block at a time.
pub struct CarReader<R> {
    pub reader: R,
    pub header: CarHeader,
}

impl<R> CarReader<R>
where
    R: AsyncRead + Send + Unpin,
{
    /// Creates a new CarReader and parses the CarHeader
    pub async fn new(mut reader: R) -> Result<Self, Error> {
        let (header, _) = read_header(&mut reader).await?;
        Ok(CarReader { reader, header })
    }

    /// Returns the next IPLD Block in the buffer
    pub async fn next_block(&mut self) -> Result<Option<Block>, Error> {
        // Read node -> cid, bytes
        let block = read_node(&mut self.reader)
            .await?
            .map(|(cid, data)| Block { cid, data });
        Ok(block)
    }
}

#[derive(Clone, Copy, Debug)]
struct BlockLocation {
    offset: u64,
    len: u64,
}

/// Random-access CAR reader. A single scan over the file builds a
/// `Cid -> (offset, len)` index; block bytes are then served by seeking.
/// Memory use is bounded by the index, never by block payloads.
pub struct CarIndexedReader<R> {
    reader: futures::io::BufReader<R>,
    header: CarHeader,
    index: HashMap<Cid, BlockLocation>,
}

impl<R> CarIndexedReader<R>
where
    R: AsyncRead + AsyncSeek + Send + Unpin,
{
    pub async fn new(reader: R) -> Result<Self, Error> {
        let mut reader = futures::io::BufReader::new(reader);
        let (header, header_len) = read_header(&mut reader).await?;

        let mut offset = header_len;
        let mut index = HashMap::new();
        while let Some(buf) = ld_read(&mut reader).await? {
            let mut cursor = std::io::Cursor::new(&buf);
            let cid = Cid::read_bytes(&mut cursor)?;
            let cid_len = cursor.position();
            let section_len = buf.len() as u64;
            index.insert(
                cid,
                BlockLocation {
                    offset: offset + varint_len(section_len) + cid_len,
                    len: section_len - cid_len,
                },
            );
            offset += varint_len(section_len) + section_len;
        }
        Ok(CarIndexedReader {
            reader,
            header,
            index,
        })
    }

    /// Declared root list from the header.
    pub fn roots(&self) -> &[Cid] {
        &self.header.roots
    }

    pub fn has(&self, cid: &Cid) -> bool {
        self.index.contains_key(cid)
    }

    /// Number of distinct blocks in the file.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Reads the block payload for `cid`, or `None` if the file lacks it.
    pub async fn get(&mut self, cid: &Cid) -> Result<Option<Vec<u8>>, Error> {
        let location = match self.index.get(cid) {
            Some(location) => *location,
            None => return Ok(None),
        };
        self.reader.seek(SeekFrom::Start(location.offset)).await?;
        let mut buf = vec![0u8; location.len as usize];
        futures::AsyncReadExt::read_exact(&mut self.reader, &mut buf)
            .await
            .map_err(|e| Error::InvalidFile(format!("block read past end of file: {e}")))?;
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use multihash::{Code, MultihashDigest};

    fn cbor_cid(data: &[u8]) -> Cid {
        Cid::new_v1(fvm_ipld_encoding::DAG_CBOR, Code::Blake2b256.digest(data))
    }

    #[test]
    fn symmetric_header() {
        let cid = cbor_cid(b"test");

        let header = CarHeader {
            roots: vec![cid],
            version: 1,
        };

        let bytes = to_vec(&header).unwrap();
        assert_eq!(from_slice::<CarHeader>(&bytes).unwrap(), header);
        assert_eq!(bytes.len() as u64 + 1, SINGLE_ROOT_HEADER_LEN);
    }

    #[async_std::test]
    async fn car_write_read() {
        let root = cbor_cid(b"root");
        let child = cbor_cid(b"child");

        let mut buffer = Vec::new();
        let mut writer = CarWriter::new(&mut buffer, vec![root]).await.unwrap();
        writer.write(&root, b"root data").await.unwrap();
        writer.write(&child, b"child data").await.unwrap();
        writer.flush().await.unwrap();

        let mut reader = CarReader::new(Cursor::new(&buffer)).await.unwrap();
        assert_eq!(reader.header.roots, vec![root]);
        assert_eq!(
            reader.next_block().await.unwrap().unwrap(),
            Block {
                cid: root,
                data: b"root data".to_vec()
            }
        );
        assert_eq!(
            reader.next_block().await.unwrap().unwrap(),
            Block {
                cid: child,
                data: b"child data".to_vec()
            }
        );
        assert!(reader.next_block().await.unwrap().is_none());
    }

    #[async_std::test]
    async fn indexed_reader_random_access() {
        let root = cbor_cid(b"root");
        let child = cbor_cid(b"child");
        let absent = cbor_cid(b"absent");

        let mut buffer = Vec::new();
        let mut writer = CarWriter::new(&mut buffer, vec![root]).await.unwrap();
        writer.write(&root, b"root data").await.unwrap();
        writer.write(&child, b"child data").await.unwrap();
        writer.flush().await.unwrap();

        let mut indexed = CarIndexedReader::new(Cursor::new(buffer)).await.unwrap();
        assert_eq!(indexed.roots(), [root]);
        assert_eq!(indexed.len(), 2);
        assert!(indexed.has(&child));
        assert!(!indexed.has(&absent));
        // out-of-order reads
        assert_eq!(
            indexed.get(&child).await.unwrap().unwrap(),
            b"child data".to_vec()
        );
        assert_eq!(
            indexed.get(&root).await.unwrap().unwrap(),
            b"root data".to_vec()
        );
        assert_eq!(indexed.get(&absent).await.unwrap(), None);
    }

    #[async_std::test]
    async fn rejects_unknown_version() {
        let cid = cbor_cid(b"test");
        let header = CarHeader {
            roots: vec![cid],
            version: 2,
        };
        let mut buffer = Vec::new();
        crate::util::ld_write(&mut buffer, &to_vec(&header).unwrap())
            .await
            .unwrap();
        assert!(CarReader::new(Cursor::new(&buffer)).await.is_err());
    }
}
