use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};

use rustkv::codec::FrameCodec;
use rustkv::connection::{Connection, ConnectionError};
use rustkv::frame::{self, Frame};

async fn create_tcp_connection() -> Result<(UnboundedSender<Vec<u8>>, TcpStream), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            while let Some(data) = rx.recv().await {
                // Write the received channel data to the socket.
                if socket.write_all(&data).await.is_err() {
                    break;
                }
            }
            // Dropping the socket once the sender is gone closes the stream.
        }
    });

    // Connect to the server as a client to complete the setup.
    let stream = TcpStream::connect(local_addr).await?;

    Ok((tx, stream))
}

async fn create_connection() -> (UnboundedSender<Vec<u8>>, Connection) {
    let (tx, stream) = create_tcp_connection().await.unwrap();
    (tx, Connection::new(stream, FrameCodec::default()))
}

#[tokio::test]
async fn test_parse_single_string() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b"+OK\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Simple("OK".to_string()));

    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_parse_bulk_string() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b"$5\r\nhello\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Bulk(Bytes::from("hello")));

    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_parse_array() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    let bytes = b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n";

    tcp_stream_tx.send(bytes.to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Array(vec![
        Frame::Bulk(Bytes::from("SET")),
        Frame::Bulk(Bytes::from("mykey")),
        Frame::Bulk(Bytes::from("myvalue")),
    ]));

    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_parse_map() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    let bytes = b"%2\r\n+a\r\n:1\r\n+b\r\n$-1\r\n";

    tcp_stream_tx.send(bytes.to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Map(vec![
        (Frame::Simple("a".to_string()), Frame::Integer(1)),
        (Frame::Simple("b".to_string()), Frame::Null),
    ]));

    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_parse_null_bulk_string() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b"$-1\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();

    assert_eq!(actual, Some(Frame::Null));
}

#[tokio::test]
async fn test_parse_multiple_commands_sequentially() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    let simple_string = b"+OK\r\n";
    let bulk_string = b"$5\r\nhello\r\n";
    let array_1 = b"*3\r\n$3\r\nSET\r\n$7\r\nmykey_1\r\n$9\r\nmyvalue_1\r\n";
    let simple_error = b"-Error message\r\n";
    let integer = b":1000\r\n";

    // All of it in a single write.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(simple_string);
    bytes.extend_from_slice(bulk_string);
    bytes.extend_from_slice(array_1);
    bytes.extend_from_slice(simple_error);
    bytes.extend_from_slice(integer);
    tcp_stream_tx.send(bytes).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Some(Frame::Simple("OK".to_string())));

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Some(Frame::Bulk(Bytes::from("hello"))));

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Array(vec![
        Frame::Bulk(Bytes::from("SET")),
        Frame::Bulk(Bytes::from("mykey_1")),
        Frame::Bulk(Bytes::from("myvalue_1")),
    ]));
    assert_eq!(actual, expected);

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Some(Frame::Error(String::from("Error message"))));

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Some(Frame::Integer(1000)));
}

#[tokio::test]
async fn test_parse_incomplete_frame() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    // Command split into three parts to simulate partial/incomplete data sending.
    // "*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n";
    let part1 = b"*3\r\n$3\r\nSE";
    let part2 = b"T\r\n$5\r\nmyke";
    let part3 = b"y\r\n$7\r\nmyvalue\r\n";

    tokio::spawn(async move {
        let parts = vec![part1.to_vec(), part2.to_vec(), part3.to_vec()];
        for part in parts {
            tcp_stream_tx.send(part).unwrap();
            // Simulate a delay in sending/receiving the data.
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    });

    let actual = connection.read_frame().await.unwrap();
    let expected = Some(Frame::Array(vec![
        Frame::Bulk(Bytes::from("SET")),
        Frame::Bulk(Bytes::from("mykey")),
        Frame::Bulk(Bytes::from("myvalue")),
    ]));
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_disconnect_between_frames() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b":1\r\n".to_vec()).unwrap();
    drop(tcp_stream_tx);

    assert_eq!(
        connection.read_frame().await.unwrap(),
        Some(Frame::Integer(1))
    );
    assert_eq!(connection.read_frame().await.unwrap(), None);
}

#[tokio::test]
async fn test_disconnect_mid_frame() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b"*2\r\n:1\r\n".to_vec()).unwrap();
    drop(tcp_stream_tx);

    let err = connection.read_frame().await.unwrap_err();

    assert!(matches!(
        err,
        ConnectionError::Malformed(frame::Error::UnexpectedEof)
    ));
}

#[tokio::test]
async fn test_invalid_data_type() {
    let (tcp_stream_tx, mut connection) = create_connection().await;

    tcp_stream_tx.send(b"&1\r\n".to_vec()).unwrap();

    let err = connection.read_frame().await.unwrap_err();

    assert!(matches!(
        err,
        ConnectionError::Malformed(frame::Error::InvalidDataType('&'))
    ));
}

#[tokio::test]
async fn test_read_timeout() {
    let (_tcp_stream_tx, stream) = create_tcp_connection().await.unwrap();
    let timeout = std::time::Duration::from_millis(50);
    let mut connection = Connection::new(stream, FrameCodec::default()).with_timeout(Some(timeout));

    let err = connection.read_frame().await.unwrap_err();

    assert!(matches!(err, ConnectionError::Timeout(d) if d == timeout));
}
