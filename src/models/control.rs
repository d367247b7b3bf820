// AWS control actions: Auto Scaling group capacity and security group ingress rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ControlError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ControlError {
    ControlError {
        field,
        reason: reason.into(),
    }
}

/// Body of POST /api/aws/scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub asg: String,
    pub desired_capacity: u32,
}

impl ScaleRequest {
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.asg.trim().is_empty() {
            return Err(invalid("asg", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IpProtocol::Tcp => "tcp",
            IpProtocol::Udp => "udp",
            IpProtocol::Icmp => "icmp",
        })
    }
}

/// Body of POST /api/aws/security/firewall: one ingress rule on a security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub sg_id: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: IpProtocol,
    pub cidr: String,
}

impl FirewallRule {
    pub fn validate(&self) -> Result<(), ControlError> {
        if !self.sg_id.starts_with("sg-") || self.sg_id.len() == 3 {
            return Err(invalid("sg_id", "expected a security group id like sg-0123abcd"));
        }
        if self.port == 0 && self.protocol != IpProtocol::Icmp {
            return Err(invalid("port", "must be 1-65535"));
        }
        validate_cidr(&self.cidr)
    }
}

/// `address/prefix` with the prefix bounded by the address family.
fn validate_cidr(cidr: &str) -> Result<(), ControlError> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| invalid("cidr", format!("{} has no prefix length", cidr)))?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| invalid("cidr", format!("{} is not an IP address", addr)))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| invalid("cidr", format!("{} is not a prefix length", prefix)))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid("cidr", format!("prefix /{} exceeds /{}", prefix, max)));
    }
    Ok(())
}
