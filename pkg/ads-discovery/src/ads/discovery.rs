//! APIs for discovering ADS devices on the controller network.
//!
//! A discovery session is a single broadcast, followed by listening for
//! answers until a deadline passes:
//!
//! 1. [`discover_devices`] when you just want everything that answered within
//!    a timeout.
//! 2. [`discover_devices_until`] when the caller also wants to be able to stop
//!    early, e.g. because someone pressed Ctrl-C.
//! 3. [`discover_on`] if you already know exactly which local address to send
//!    from, and where to send to.
//!
//! It should be noted you can only find devices that are on the same broadcast
//! domain as one of your interfaces. Routers don't forward the search.

use crate::{
	ads::{
		proto::{is_discovery_response, DiscoveryRequest, RemotePlcInfo},
		subnet::ManagedSubnet,
		ADS_DISCOVERY_PORT, ADS_DISCOVERY_WRITE_TIMEOUT_MILLISECONDS,
	},
	errors::{AdsScanError, NetworkError},
};
use bytes::{Bytes, BytesMut};
use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use std::{
	future::{pending, Future},
	net::{IpAddr, Ipv4Addr, SocketAddr},
};
use tokio::{
	net::UdpSocket,
	time::{sleep_until, timeout, Duration, Instant},
};
use tracing::{debug, error, field::valuable, trace, warn};

/// Answers are a few hundred bytes at most, this leaves plenty of room.
const RECEIVE_BUFFER_SIZE: usize = 4096;

/// Broadcast a search on the interface inside of `subnet`, and collect every
/// answer that arrives within `listen_for`.
///
/// The result is always sorted by IPv4 address.
///
/// ## Errors
///
/// - If no interface has an address inside of `subnet`.
/// - If we can't bind a socket, or mark it as broadcast.
/// - If the search couldn't be sent.
/// - If receiving failed part way through, in which case everything received
///   so far is returned inside of [`AdsScanError::DiscoveryInterrupted`].
pub async fn discover_devices(
	subnet: &ManagedSubnet,
	listen_for: Duration,
) -> Result<Vec<RemotePlcInfo>, AdsScanError> {
	discover_devices_until(subnet, listen_for, pending::<()>()).await
}

/// The same as [`discover_devices`], but listening also stops as soon as
/// `cancel` completes.
///
/// Cancelling is not an error, whatever has been received up until that point
/// is returned (sorted) just like a session that hit its deadline.
///
/// ## Errors
///
/// See the error notes for [`discover_devices`].
pub async fn discover_devices_until<CancelFut>(
	subnet: &ManagedSubnet,
	listen_for: Duration,
	cancel: CancelFut,
) -> Result<Vec<RemotePlcInfo>, AdsScanError>
where
	CancelFut: Future<Output = ()>,
{
	let (local_address, broadcast_address) = find_local_interface(subnet)?;
	debug!(
		%subnet,
		%local_address,
		%broadcast_address,
		"found interface to search from"
	);

	discover_on(
		SocketAddr::new(IpAddr::V4(local_address), 0),
		SocketAddr::new(IpAddr::V4(broadcast_address), ADS_DISCOVERY_PORT),
		listen_for,
		cancel,
	)
	.await
}

/// Run a single discovery session from an explicit local address.
///
/// This binds a socket on `local`, sends one search to `target` (normally
/// the subnet broadcast on port [`ADS_DISCOVERY_PORT`]), and then parses
/// everything that arrives until `listen_for` passes, or `cancel` completes.
///
/// Datagrams that aren't discovery responses still produce an entry, with
/// only the address filled in, the same as a device that sent garbage.
///
/// ## Errors
///
/// See the error notes for [`discover_devices`].
pub async fn discover_on<CancelFut>(
	local: SocketAddr,
	target: SocketAddr,
	listen_for: Duration,
	cancel: CancelFut,
) -> Result<Vec<RemotePlcInfo>, AdsScanError>
where
	CancelFut: Future<Output = ()>,
{
	let socket = UdpSocket::bind(local).await.map_err(|cause| {
		debug!(?cause, %local, "failed to bind discovery socket");
		NetworkError::BindAddressError
	})?;
	socket
		.set_broadcast(true)
		.map_err(|_| NetworkError::SetBroadcastFailure)?;

	let request = DiscoveryRequest::for_local_address(local.ip());
	let serialized = Bytes::from(&request);
	match timeout(
		Duration::from_millis(ADS_DISCOVERY_WRITE_TIMEOUT_MILLISECONDS),
		socket.send_to(&serialized, target),
	)
	.await
	{
		Ok(Ok(_sent)) => {}
		Ok(Err(cause)) => return Err(NetworkError::IOError(cause).into()),
		Err(_elapsed) => return Err(NetworkError::TimeoutError.into()),
	}
	debug!(%request, %target, "sent discovery request");

	let deadline = Instant::now() + listen_for;
	tokio::pin!(cancel);
	let mut collected = Vec::new();
	let mut buff = BytesMut::zeroed(RECEIVE_BUFFER_SIZE);

	loop {
		tokio::select! {
			result = socket.recv_from(&mut buff) => {
				let (read_length, from) = match result {
					Ok(data) => data,
					Err(cause) => {
						error!(?cause, received = collected.len(), "discovery socket failed while receiving");
						sort_by_address(&mut collected);
						return Err(AdsScanError::DiscoveryInterrupted {
							collected,
							cause: NetworkError::IOError(cause),
						});
					}
				};
				let from_ip = match from.ip() {
					IpAddr::V4(v4) => v4,
					IpAddr::V6(v6) => {
						debug!(%v6, "discovery answer from IPv6, ignoring");
						continue;
					}
				};

				let packet = &buff[..read_length];
				if !is_discovery_response(packet) {
					warn!(%from, packet = %format!("{packet:02x?}"), "answer was not a discovery response");
				}
				let info = RemotePlcInfo::parse(from_ip, packet);
				trace!(device = valuable(&info), "parsed discovery response");
				collected.push(info);
			}
			() = sleep_until(deadline) => {
				break;
			}
			() = &mut cancel => {
				debug!(received = collected.len(), "discovery session cancelled");
				break;
			}
		}
	}

	sort_by_address(&mut collected);
	Ok(collected)
}

/// Find the local IPv4 address inside of `subnet`, along with the broadcast
/// address to search on.
///
/// Loopback addresses are skipped. If the interface doesn't report a
/// broadcast address we compute one from the subnet.
///
/// ## Errors
///
/// - If we cannot list the network interfaces present on the system.
/// - If none of them have an address inside of `subnet`.
pub fn find_local_interface(subnet: &ManagedSubnet) -> Result<(Ipv4Addr, Ipv4Addr), NetworkError> {
	let interfaces = NetworkInterface::show().map_err(|cause| {
		error!(?cause, "could not list network interfaces on this device");
		NetworkError::ListInterfacesError
	})?;

	for iface in &interfaces {
		for local_address in &iface.addr {
			let IpAddr::V4(ipv4) = local_address.ip() else {
				continue;
			};
			if ipv4.is_loopback() {
				trace!(iface = %iface.name, %ipv4, "skipping loopback address");
				continue;
			}
			if !subnet.contains(ipv4) {
				continue;
			}

			let broadcast = match local_address.broadcast() {
				Some(IpAddr::V4(reported)) => reported,
				_ => subnet.broadcast(),
			};
			return Ok((ipv4, broadcast));
		}
	}

	Err(NetworkError::NoInterfaceInSubnet(subnet.to_string()))
}

/// Stable sort by numeric IPv4 address, so output doesn't depend on the order
/// answers happened to arrive in.
pub fn sort_by_address(devices: &mut [RemotePlcInfo]) {
	devices.sort_by_key(|device| u32::from(device.address()));
}
