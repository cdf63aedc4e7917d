// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_std::fs::File;
use async_std::io::{BufReader, BufWriter};
use chainpack_car::{CarIndexedReader, CarReader, CarWriter};
use cid::Cid;
use multihash::{Code, MultihashDigest};

const RAW: u64 = 0x55;

fn raw_cid(data: &[u8]) -> Cid {
    Cid::new_v1(RAW, Code::Blake2b256.digest(data))
}

#[async_std::test]
async fn file_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("blocks.car");

    let payloads: Vec<Vec<u8>> = (0u32..32).map(|i| i.to_be_bytes().repeat(64)).collect();
    let cids: Vec<Cid> = payloads.iter().map(|p| raw_cid(p)).collect();

    let file = File::create(&path).await.unwrap();
    let mut writer = CarWriter::new(BufWriter::new(file), vec![cids[0]])
        .await
        .unwrap();
    for (cid, data) in cids.iter().zip(&payloads) {
        writer.write(cid, data).await.unwrap();
    }
    writer.flush().await.unwrap();

    // streaming pass sees every block in write order
    let file = File::open(&path).await.unwrap();
    let mut reader = CarReader::new(BufReader::new(file)).await.unwrap();
    assert_eq!(reader.header.roots, vec![cids[0]]);
    let mut seen = 0;
    while let Some(block) = reader.next_block().await.unwrap() {
        assert_eq!(block.cid, cids[seen]);
        assert_eq!(block.data, payloads[seen]);
        seen += 1;
    }
    assert_eq!(seen, payloads.len());

    // indexed pass serves arbitrary lookups
    let file = File::open(&path).await.unwrap();
    let mut indexed = CarIndexedReader::new(file).await.unwrap();
    assert_eq!(indexed.len(), payloads.len());
    for (cid, data) in cids.iter().zip(&payloads).rev() {
        assert_eq!(indexed.get(cid).await.unwrap().unwrap(), *data);
    }
}
