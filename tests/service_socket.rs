// Mon Oct 19 2026 - Alex

use memhook::config::Config;
use memhook::memory::{DevMemMapper, ProcessMemory};
use memhook::service::{
    wire, Caller, MemoryRequest, MemoryService, PrivilegeMode, PrivilegePolicy, ServiceClient,
    ServiceError, ServiceHandle, UnixDatagramTransport, MAX_PAYLOAD,
};
use memhook::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("memhook-it-{}-{}", name, std::process::id()))
}

struct Fixture {
    handle: ServiceHandle,
    client: ServiceClient,
    physical: PathBuf,
}

impl Fixture {
    fn start(tag: &str) -> Self {
        let physical = temp_path(&format!("{}-phys", tag));
        std::fs::write(&physical, vec![0xA5u8; 8192]).unwrap();

        let config = Config::new()
            .with_socket_path(temp_path(&format!("{}-server.sock", tag)))
            .with_physical_device(physical.clone())
            .with_privilege(PrivilegeMode::AllowAll);
        let handle = ServiceHandle::serve(&config).unwrap();
        let client = ServiceClient::connect(
            &config.socket_path,
            temp_path(&format!("{}-client.sock", tag)),
            Duration::from_secs(5),
        )
        .unwrap();

        Self {
            handle,
            client,
            physical,
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.handle.stop();
        let _ = std::fs::remove_file(&self.physical);
    }
}

#[test]
fn hello_kernel_round_trip() {
    let fixture = Fixture::start("hello");
    let mut buffer = [0u8; 32];
    let address = buffer.as_mut_ptr() as u64;

    fixture.client.write_virtual(address, b"Hello Kernel!").unwrap();
    let data = fixture.client.read_virtual(address, 13).unwrap();
    assert_eq!(data, b"Hello Kernel!");
    assert_eq!(&unsafe { std::ptr::read_volatile(&buffer) }[..13], b"Hello Kernel!");
    assert!(fixture.handle.requests_served() >= 2);
}

#[test]
fn oversize_request_is_rejected_without_touching_memory() {
    let fixture = Fixture::start("oversize");
    let target = [0x11u8; 16];
    let mut request = MemoryRequest::write_virtual(target.as_ptr() as u64, &[0u8; 16]).unwrap();
    request.length = MAX_PAYLOAD as u64 + 1;

    let reply = fixture.client.request(&request).unwrap();
    assert_eq!(reply.kind(), Some(ErrorKind::PayloadTooLarge));
    assert_eq!(unsafe { std::ptr::read_volatile(&target) }, [0x11; 16]);

    let err = fixture.client.read_virtual(0x1000, MAX_PAYLOAD + 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
}

#[test]
fn bad_address_faults_and_service_keeps_running() {
    let fixture = Fixture::start("fault");
    let err = fixture.client.read_virtual(0x10, 8).unwrap_err();
    assert!(matches!(err, ServiceError::Remote(ErrorKind::Fault)));

    let value = 7u64;
    let data = fixture.client.read_virtual(&value as *const u64 as u64, 8).unwrap();
    assert_eq!(data, 7u64.to_ne_bytes());
}

#[test]
fn physical_access_within_and_beyond_the_device() {
    let fixture = Fixture::start("physical");
    assert_eq!(fixture.client.read_physical(4096, 4).unwrap(), vec![0xA5; 4]);

    fixture.client.write_physical(100, b"phys").unwrap();
    assert_eq!(fixture.client.read_physical(100, 4).unwrap(), b"phys");

    let err = fixture.client.read_physical(1 << 32, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
}

#[test]
fn malformed_frame_gets_invalid_argument() {
    let fixture = Fixture::start("malformed");
    let server = temp_path("malformed-server.sock");
    let raw_path = temp_path("malformed-raw.sock");
    let _ = std::fs::remove_file(&raw_path);
    let raw = UnixDatagram::bind(&raw_path).unwrap();
    raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    raw.send_to(b"not a frame", &server).unwrap();
    let mut buf = [0u8; 256];
    let n = raw.recv(&mut buf).unwrap();
    let (_, reply) = wire::decode_reply(&buf[..n]).unwrap();
    assert_eq!(reply.kind(), Some(ErrorKind::InvalidArgument));

    drop(raw);
    let _ = std::fs::remove_file(&raw_path);
    drop(fixture);
}

struct DenyAll;

impl PrivilegePolicy for DenyAll {
    fn name(&self) -> &str {
        "deny-all"
    }

    fn is_privileged(&self, _caller: &Caller) -> bool {
        false
    }
}

#[test]
fn unprivileged_caller_is_always_denied() {
    let server_path = temp_path("denied-server.sock");
    let service = MemoryService::new(
        Arc::new(ProcessMemory::current()),
        Arc::new(DevMemMapper::default()),
        Box::new(DenyAll),
    );
    let transport = UnixDatagramTransport::bind(&server_path, Some(Duration::from_millis(50))).unwrap();
    let mut handle = ServiceHandle::with_service(service, transport).unwrap();
    let client = ServiceClient::connect(
        &server_path,
        temp_path("denied-client.sock"),
        Duration::from_secs(5),
    )
    .unwrap();

    let value = 1u32;
    let address = &value as *const u32 as u64;
    let results = [
        client.read_virtual(address, 4).map(|_| ()),
        client.write_virtual(address, &[0; 4]),
        client.read_physical(0, 4).map(|_| ()),
        client.write_physical(0, &[0; 4]),
    ];
    for result in results {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PermissionDenied);
    }
    assert_eq!(value, 1);
    handle.stop();
}
