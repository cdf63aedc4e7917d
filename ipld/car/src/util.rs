// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::error::Error;
use cid::Cid;
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use integer_encoding::{VarIntAsyncReader, VarIntAsyncWriter};

/// Reads one varint-length-delimited section. `Ok(None)` signals a clean end
/// of stream; a partial section is a parsing error.
pub(crate) async fn ld_read<R>(reader: &mut R) -> Result<Option<Vec<u8>>, Error>
where
    R: AsyncRead + Send + Unpin,
{
    let len: usize = match reader.read_varint_async().await {
        Ok(len) => len,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(Error::Io(e));
        }
    };

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::ParsingError("truncated section".to_string())
        } else {
            Error::Io(e)
        }
    })?;
    Ok(Some(buf))
}

/// Writes one varint-length-delimited section.
pub(crate) async fn ld_write<W>(writer: &mut W, bytes: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Send + Unpin,
{
    writer.write_varint_async(bytes.len()).await?;
    writer.write_all(bytes).await?;
    Ok(())
}

/// Reads one section and splits it into its CID prefix and block payload.
pub(crate) async fn read_node<R>(buf_reader: &mut R) -> Result<Option<(Cid, Vec<u8>)>, Error>
where
    R: AsyncRead + Send + Unpin,
{
    match ld_read(buf_reader).await? {
        Some(buf) => {
            let mut cursor = std::io::Cursor::new(&buf);
            let cid = Cid::read_bytes(&mut cursor)?;
            Ok(Some((cid, buf[cursor.position() as usize..].to_vec())))
        }
        None => Ok(None),
    }
}

/// Number of bytes the unsigned varint encoding of `value` occupies.
pub(crate) fn varint_len(mut value: u64) -> u64 {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    #[async_std::test]
    async fn ld_round_trip() {
        let mut buffer = Vec::new();
        ld_write(&mut buffer, b"test bytes").await.unwrap();
        let mut reader = Cursor::new(&buffer);
        let read = ld_read(&mut reader).await.unwrap().unwrap();
        assert_eq!(read, b"test bytes");
        assert!(ld_read(&mut reader).await.unwrap().is_none());
    }

    #[async_std::test]
    async fn truncated_section_fails() {
        let mut buffer = Vec::new();
        ld_write(&mut buffer, b"test bytes").await.unwrap();
        buffer.truncate(buffer.len() - 2);
        let mut reader = Cursor::new(&buffer);
        assert!(ld_read(&mut reader).await.is_err());
    }

    #[test]
    fn varint_len_boundaries() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 3);
    }
}
