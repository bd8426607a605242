use super::{Packet, PacketType, MAX_BODY_LEN};
use crate::domain::error::FrameError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Read one frame, blocking until the whole body has arrived.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut length = [0u8; 1];
    reader
        .read_exact(&mut length)
        .await
        .map_err(FrameError::from_read)?;
    let length = length[0];

    if length == 0 {
        return Err(FrameError::InvalidFrame(length));
    }

    let mut body = vec![0u8; length as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(FrameError::from_read)?;

    let packet_type = PacketType::from(body[0]);
    body.remove(0);

    debug!("Read packet: type={}, payload length={}", packet_type, body.len());
    trace!("Payload: {}", hex::encode(&body));

    Ok(Packet {
        packet_type,
        payload: body,
    })
}

/// Write one frame and flush it.
///
/// The frame is assembled first and handed to `write_all`, which keeps
/// writing after short writes until everything is sent or the stream fails.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let body_len = packet.body_len();
    if body_len > MAX_BODY_LEN {
        return Err(FrameError::PayloadTooLarge(body_len));
    }

    let mut frame = Vec::with_capacity(1 + body_len);
    frame.push(body_len as u8);
    frame.push(packet.packet_type.as_byte());
    frame.extend_from_slice(&packet.payload);

    debug!(
        "Writing packet: type={}, total length={}",
        packet.packet_type, body_len
    );
    trace!("Payload: {}", hex::encode(&packet.payload));

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_data_packet() {
        let mut stream = Builder::new().read(&[0x04, 0x01, b'a', b'b', b'c']).build();
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet, Packet::data(b"abc".to_vec()));
    }

    #[tokio::test]
    async fn test_read_body_split_across_reads() {
        let mut stream = Builder::new()
            .read(&[0x03])
            .read(&[0x02])
            .read(&[0x05, 0xff])
            .build();
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet.packet_type, PacketType::Flow);
        assert_eq!(packet.payload, vec![0x05, 0xff]);
    }

    #[tokio::test]
    async fn test_read_type_only_frame() {
        let mut stream = Builder::new().read(&[0x01, 0x02]).build();
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet.packet_type, PacketType::Flow);
        assert!(packet.payload.is_empty());
    }

    #[tokio::test]
    async fn test_read_unknown_type_is_not_an_error() {
        let mut stream = Builder::new().read(&[0x02, 0x09, 0x00]).build();
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet.packet_type, PacketType::Unknown(0x09));
    }

    #[tokio::test]
    async fn test_read_zero_length_is_invalid() {
        let mut stream = Builder::new().read(&[0x00]).build();
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrame(0)));
    }

    #[tokio::test]
    async fn test_read_closed_before_length() {
        let mut stream = Builder::new().build();
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_read_closed_after_length() {
        let mut stream = Builder::new().read(&[0x05]).build();
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_read_closed_mid_body() {
        let mut stream = Builder::new().read(&[0x05, 0x01, 0xaa]).build();
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_read_io_error() {
        let mut stream = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::Other, "boom"))
            .build();
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[tokio::test]
    async fn test_write_data_packet() {
        let payload: Vec<u8> = (0u8..10).collect();
        let mut expected = vec![0x0b, 0x01];
        expected.extend_from_slice(&payload);

        let mut stream = Builder::new().write(&expected).build();
        write_packet(&mut stream, &Packet::data(payload)).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_flow_packet() {
        let mut stream = Builder::new().write(&[0x02, 0x02, 0x05]).build();
        write_packet(&mut stream, &Packet::flow(0x05)).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_largest_payload() {
        let payload = vec![0x5a; 254];
        let mut buf = Vec::new();
        write_packet(&mut buf, &Packet::data(payload)).await.unwrap();
        assert_eq!(buf.len(), 256);
        assert_eq!(buf[0], 0xff);
    }

    #[tokio::test]
    async fn test_write_rejects_oversized_payload() {
        let mut buf = Vec::new();
        let err = write_packet(&mut buf, &Packet::data(vec![0u8; 255]))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge(256)));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_write_error_is_reported() {
        let mut stream = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let err = write_packet(&mut stream, &Packet::flow(0x01)).await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[tokio::test]
    async fn test_consecutive_frames_stay_aligned() {
        let mut buf = Vec::new();
        write_packet(&mut buf, &Packet::data(b"first".to_vec())).await.unwrap();
        write_packet(&mut buf, &Packet::flow(0x0f)).await.unwrap();
        write_packet(&mut buf, &Packet::data(Vec::new())).await.unwrap();

        let mut reader = buf.as_slice();
        assert_eq!(read_packet(&mut reader).await.unwrap(), Packet::data(b"first".to_vec()));
        assert_eq!(read_packet(&mut reader).await.unwrap(), Packet::flow(0x0f));
        assert_eq!(read_packet(&mut reader).await.unwrap(), Packet::data(Vec::new()));
        assert!(matches!(
            read_packet(&mut reader).await.unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_preserves_frame(
                tag in prop_oneof![Just(0x01u8), Just(0x02u8), any::<u8>()],
                payload in proptest::collection::vec(any::<u8>(), 0..=253),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                let packet = Packet::new(PacketType::from(tag), payload);
                let decoded = runtime.block_on(async {
                    let mut buf = Vec::new();
                    write_packet(&mut buf, &packet).await.unwrap();
                    prop_assert_eq!(buf[0] as usize, packet.body_len());
                    let mut reader = buf.as_slice();
                    Ok::<_, TestCaseError>(read_packet(&mut reader).await.unwrap())
                })?;
                prop_assert_eq!(decoded, packet);
            }
        }
    }
}
