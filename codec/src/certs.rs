use crate::utils::*;
use minicbor::{Decoder, data::Tag};
use sendada_common::{rational_number::RationalNumber, *};

const CERT_STAKE_REGISTRATION: u64 = 0;
const CERT_STAKE_DEREGISTRATION: u64 = 1;
const CERT_STAKE_DELEGATION: u64 = 2;
const CERT_POOL_REGISTRATION: u64 = 3;

const RELAY_SINGLE_HOST_ADDR: u64 = 0;
const RELAY_SINGLE_HOST_NAME: u64 = 1;
const RELAY_MULTI_HOST_NAME: u64 = 2;

/// Tag for rational numbers (unit intervals)
const TAG_RATIONAL: u64 = 30;

pub fn write_stake_credential(
    credential: &StakeCredential,
    e: &mut CborEncoder,
) -> Result<(), WalletError> {
    let (kind, hash) = match credential {
        StakeCredential::AddrKeyHash(hash) => (0u8, hash),
        StakeCredential::ScriptHash(hash) => (1u8, hash),
    };
    e.array(2)?.u8(kind)?.bytes(hash.as_ref())?;
    Ok(())
}

pub fn decode_stake_credential(d: &mut Decoder) -> Result<StakeCredential, WalletError> {
    expect_array(d, 2, "stake credential")?;
    let kind = d.u64()?;
    let hash = decode_hash(d, "stake credential hash")?;
    match kind {
        0 => Ok(StakeCredential::AddrKeyHash(hash)),
        1 => Ok(StakeCredential::ScriptHash(hash)),
        other => Err(WalletError::malformed(format!(
            "unknown stake credential tag {other}"
        ))),
    }
}

fn write_optional_port(port: Option<u16>, e: &mut CborEncoder) -> Result<(), WalletError> {
    match port {
        Some(port) => e.u16(port)?,
        None => e.null()?,
    };
    Ok(())
}

fn write_relay(relay: &Relay, e: &mut CborEncoder) -> Result<(), WalletError> {
    match relay {
        Relay::SingleHostAddr { port, ipv4, ipv6 } => {
            e.array(4)?.u64(RELAY_SINGLE_HOST_ADDR)?;
            write_optional_port(*port, e)?;
            match ipv4 {
                Some(ip) => e.bytes(ip)?,
                None => e.null()?,
            };
            match ipv6 {
                Some(ip) => e.bytes(ip)?,
                None => e.null()?,
            };
        }
        Relay::SingleHostName { port, dns_name } => {
            e.array(3)?.u64(RELAY_SINGLE_HOST_NAME)?;
            write_optional_port(*port, e)?;
            e.str(dns_name)?;
        }
        Relay::MultiHostName { dns_name } => {
            e.array(2)?.u64(RELAY_MULTI_HOST_NAME)?.str(dns_name)?;
        }
    }
    Ok(())
}

fn decode_ip<const N: usize>(d: &mut Decoder) -> Result<Option<[u8; N]>, WalletError> {
    decode_nullable(d, |d| {
        let bytes = d.bytes()?;
        bytes.try_into().map_err(|_| {
            WalletError::malformed(format!("relay address: expected {N} bytes"))
        })
    })
}

fn decode_relay(d: &mut Decoder) -> Result<Relay, WalletError> {
    let len = d.array()?;
    let kind = d.u64()?;
    let relay = match (kind, len) {
        (RELAY_SINGLE_HOST_ADDR, Some(4)) => Relay::SingleHostAddr {
            port: decode_nullable(d, |d| Ok(d.u16()?))?,
            ipv4: decode_ip::<4>(d)?,
            ipv6: decode_ip::<16>(d)?,
        },
        (RELAY_SINGLE_HOST_NAME, Some(3)) => Relay::SingleHostName {
            port: decode_nullable(d, |d| Ok(d.u16()?))?,
            dns_name: d.str()?.to_string(),
        },
        (RELAY_MULTI_HOST_NAME, Some(2)) => Relay::MultiHostName {
            dns_name: d.str()?.to_string(),
        },
        (kind, len) => {
            return Err(WalletError::malformed(format!(
                "relay: unknown tag {kind} with length {len:?}"
            )));
        }
    };
    Ok(relay)
}

fn write_pool_registration(
    pool: &PoolRegistration,
    e: &mut CborEncoder,
) -> Result<(), WalletError> {
    e.array(10)?
        .u64(CERT_POOL_REGISTRATION)?
        .bytes(pool.operator.as_ref())?
        .bytes(pool.vrf_key_hash.as_ref())?
        .u64(pool.pledge)?
        .u64(pool.cost)?
        .tag(Tag::new(TAG_RATIONAL))?
        .array(2)?
        .u64(*pool.margin.numer())?
        .u64(*pool.margin.denom())?
        .bytes(&pool.reward_account.to_binary())?;

    e.array(pool.pool_owners.len() as u64)?;
    for owner in &pool.pool_owners {
        e.bytes(owner.as_ref())?;
    }

    e.array(pool.relays.len() as u64)?;
    for relay in &pool.relays {
        write_relay(relay, e)?;
    }

    match &pool.pool_metadata {
        Some(metadata) => {
            e.array(2)?.str(&metadata.url)?.bytes(metadata.hash.as_ref())?;
        }
        None => {
            e.null()?;
        }
    }
    Ok(())
}

fn decode_pool_registration(d: &mut Decoder) -> Result<PoolRegistration, WalletError> {
    let operator = decode_hash(d, "pool operator")?;
    let vrf_key_hash = decode_hash(d, "pool vrf key hash")?;
    let pledge = d.u64()?;
    let cost = d.u64()?;

    let tag = d.tag()?;
    if tag.as_u64() != TAG_RATIONAL {
        return Err(WalletError::malformed(format!(
            "pool margin: expected tag 30, found {}",
            tag.as_u64()
        )));
    }
    expect_array(d, 2, "pool margin")?;
    let numerator = d.u64()?;
    let denominator = d.u64()?;
    if denominator == 0 {
        return Err(WalletError::malformed("pool margin: zero denominator"));
    }

    let reward_account = StakeAddress::from_binary(d.bytes()?)
        .map_err(|e| WalletError::malformed(format!("pool reward account: {e}")))?;
    let pool_owners = decode_array(d, "pool owners", |d| decode_hash(d, "pool owner"))?;
    let relays = decode_array(d, "pool relays", decode_relay)?;
    let pool_metadata = decode_nullable(d, |d| {
        expect_array(d, 2, "pool metadata")?;
        Ok(PoolMetadata {
            url: d.str()?.to_string(),
            hash: decode_hash(d, "pool metadata hash")?,
        })
    })?;

    Ok(PoolRegistration {
        operator,
        vrf_key_hash,
        pledge,
        cost,
        margin: RationalNumber::new(numerator, denominator),
        reward_account,
        pool_owners,
        relays,
        pool_metadata,
    })
}

pub fn write_certificate(cert: &TxCertificate, e: &mut CborEncoder) -> Result<(), WalletError> {
    match cert {
        TxCertificate::StakeRegistration(credential) => {
            e.array(2)?.u64(CERT_STAKE_REGISTRATION)?;
            write_stake_credential(credential, e)
        }
        TxCertificate::StakeDeregistration(credential) => {
            e.array(2)?.u64(CERT_STAKE_DEREGISTRATION)?;
            write_stake_credential(credential, e)
        }
        TxCertificate::StakeDelegation { credential, pool } => {
            e.array(3)?.u64(CERT_STAKE_DELEGATION)?;
            write_stake_credential(credential, e)?;
            e.bytes(pool.as_ref())?;
            Ok(())
        }
        TxCertificate::PoolRegistration(pool) => write_pool_registration(pool, e),
    }
}

pub fn decode_certificate(d: &mut Decoder) -> Result<TxCertificate, WalletError> {
    let len = d.array()?;
    let kind = d.u64()?;
    match (kind, len) {
        (CERT_STAKE_REGISTRATION, Some(2)) => {
            Ok(TxCertificate::StakeRegistration(decode_stake_credential(d)?))
        }
        (CERT_STAKE_DEREGISTRATION, Some(2)) => {
            Ok(TxCertificate::StakeDeregistration(decode_stake_credential(d)?))
        }
        (CERT_STAKE_DELEGATION, Some(3)) => Ok(TxCertificate::StakeDelegation {
            credential: decode_stake_credential(d)?,
            pool: decode_hash(d, "delegation pool")?,
        }),
        (CERT_POOL_REGISTRATION, Some(10)) => Ok(TxCertificate::PoolRegistration(Box::new(
            decode_pool_registration(d)?,
        ))),
        (kind, len) => Err(WalletError::malformed(format!(
            "certificate: unknown tag {kind} with length {len:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn credential() -> StakeCredential {
        StakeCredential::AddrKeyHash(KeyHash::new([0x11; 28]))
    }

    #[test]
    fn delegation_layout() {
        let cert = TxCertificate::StakeDelegation {
            credential: credential(),
            pool: PoolId::new([0x22; 28]),
        };
        let bytes = to_vec(|e| write_certificate(&cert, e)).unwrap();
        let expected = format!(
            "83028200581c{}581c{}",
            "11".repeat(28),
            "22".repeat(28)
        );
        assert_eq!(hex::encode(&bytes), expected);
        assert_eq!(decode_certificate(&mut Decoder::new(&bytes)).unwrap(), cert);
    }

    #[test]
    fn pool_registration_round_trip() {
        let cert = TxCertificate::PoolRegistration(Box::new(PoolRegistration {
            operator: PoolId::new([1; 28]),
            vrf_key_hash: VrfKeyHash::new([2; 32]),
            pledge: 500_000_000,
            cost: 340_000_000,
            margin: RationalNumber::new(3, 100),
            reward_account: StakeAddress::new(credential(), AddressNetwork::Main),
            pool_owners: vec![KeyHash::new([0x11; 28])],
            relays: vec![
                Relay::SingleHostAddr {
                    port: Some(3001),
                    ipv4: Some([10, 0, 0, 1]),
                    ipv6: None,
                },
                Relay::SingleHostName {
                    port: None,
                    dns_name: "relay.example.com".to_string(),
                },
                Relay::MultiHostName {
                    dns_name: "pool.example.com".to_string(),
                },
            ],
            pool_metadata: Some(PoolMetadata {
                url: "https://example.com/pool.json".to_string(),
                hash: MetadataHash::new([3; 32]),
            }),
        }));

        let bytes = to_vec(|e| write_certificate(&cert, e)).unwrap();
        assert_eq!(bytes[0], 0x8a);
        assert_eq!(decode_certificate(&mut Decoder::new(&bytes)).unwrap(), cert);
    }

    #[test_case("820582005800" ; "unknown certificate tag")]
    #[test_case("83008200581c00000000000000000000000000000000000000000000000000000000" ; "registration with wrong arity")]
    #[test_case("82008202581c00000000000000000000000000000000000000000000000000000000" ; "unknown credential tag")]
    fn malformed_certificates(hex_bytes: &str) {
        let bytes = hex::decode(hex_bytes).unwrap();
        assert!(matches!(
            decode_certificate(&mut Decoder::new(&bytes)),
            Err(WalletError::MalformedEncoding(_))
        ));
    }
}
