// Finding text, one title/description/recommendation triple per rule.

pub const TITLE_S3_PUBLIC: &str = "S3 bucket is publicly accessible";
pub const DESC_S3_PUBLIC: &str = "S3 bucket allows public access";
pub const REC_S3_PUBLIC: &str = "Enable S3 Block Public Access and remove public ACLs and bucket policies";
pub const TITLE_S3_UNENCRYPTED: &str = "S3 bucket is not encrypted";
pub const DESC_S3_UNENCRYPTED: &str = "S3 bucket does not have default encryption enabled";
pub const REC_S3_UNENCRYPTED: &str = "Enable server-side encryption (SSE-S3 or SSE-KMS) for the bucket";
pub const TITLE_S3_VERSIONING: &str = "S3 bucket versioning is disabled";
pub const DESC_S3_VERSIONING: &str = "Objects in this bucket cannot be recovered after overwrite or deletion";
pub const REC_S3_VERSIONING: &str = "Enable bucket versioning";

pub const TITLE_EC2_PUBLIC: &str = "EC2 instance is publicly accessible";
pub const DESC_EC2_PUBLIC: &str = "EC2 instance has a public IP address or is reachable from the internet";
pub const REC_EC2_PUBLIC: &str = "Move the instance to a private subnet behind a load balancer or bastion";
pub const TITLE_EC2_EBS_UNENCRYPTED: &str = "EBS volumes are not declared encrypted";
pub const DESC_EC2_EBS_UNENCRYPTED: &str = "The instance configuration does not mark every attached EBS volume as encrypted";
pub const REC_EC2_EBS_UNENCRYPTED: &str = "Set Encrypted=true on all block device mappings or enable EBS encryption by default";
pub const TITLE_EC2_IMDSV1: &str = "IMDSv2 is not required";
pub const DESC_EC2_IMDSV1: &str = "The instance metadata service accepts unauthenticated IMDSv1 requests";
pub const REC_EC2_IMDSV1: &str = "Set HttpTokens to required in the instance metadata options";
pub const TITLE_SG_OPEN: &str = "Security group allows ingress from anywhere";
pub const DESC_SG_OPEN: &str = "Security group allows access from anywhere (0.0.0.0/0 or ::/0)";
pub const REC_SG_OPEN: &str = "Restrict security group rules to specific IP ranges";

pub const TITLE_RDS_PUBLIC: &str = "RDS instance is publicly accessible";
pub const DESC_RDS_PUBLIC: &str = "Database endpoint is reachable from the internet";
pub const REC_RDS_PUBLIC: &str = "Disable PubliclyAccessible and place the instance in private subnets";
pub const TITLE_RDS_UNENCRYPTED: &str = "RDS storage is not encrypted";
pub const DESC_RDS_UNENCRYPTED: &str = "Database storage and snapshots are not encrypted at rest";
pub const REC_RDS_UNENCRYPTED: &str = "Enable storage encryption with a KMS key";
pub const TITLE_RDS_NO_BACKUP: &str = "RDS automated backups are disabled";
pub const DESC_RDS_NO_BACKUP: &str = "Backup retention period is 0 days";
pub const REC_RDS_NO_BACKUP: &str = "Set a backup retention period of at least 7 days";

pub const TITLE_LAMBDA_NO_VPC: &str = "Lambda function is not attached to a VPC";
pub const DESC_LAMBDA_NO_VPC: &str = "Function runs outside any VPC and cannot be restricted by network controls";
pub const REC_LAMBDA_NO_VPC: &str = "Configure VpcConfig with private subnets and security groups";

pub const TITLE_IAM_WILDCARD_ACTION: &str = "IAM policy allows every action";
pub const DESC_IAM_WILDCARD_ACTION: &str = "IAM policy uses wildcard action (*)";
pub const REC_IAM_WILDCARD_ACTION: &str = "Replace wildcard actions with specific actions";
pub const TITLE_IAM_WILDCARD_RESOURCE: &str = "IAM policy applies to every resource";
pub const DESC_IAM_WILDCARD_RESOURCE: &str = "IAM policy uses wildcard resource (*)";
pub const REC_IAM_WILDCARD_RESOURCE: &str = "Replace wildcard resources with specific ARNs";

pub const TITLE_AZURE_STORAGE_PUBLIC: &str = "Storage account allows public access";
pub const DESC_AZURE_STORAGE_PUBLIC: &str = "Blob containers in this storage account can be read anonymously";
pub const REC_AZURE_STORAGE_PUBLIC: &str = "Disable allowBlobPublicAccess on the storage account";
pub const TITLE_AZURE_STORAGE_UNENCRYPTED: &str = "Storage account is not encrypted";
pub const DESC_AZURE_STORAGE_UNENCRYPTED: &str = "Storage service encryption is disabled";
pub const REC_AZURE_STORAGE_UNENCRYPTED: &str = "Enable storage service encryption with Microsoft or customer managed keys";
pub const TITLE_AZURE_VM_PUBLIC: &str = "Virtual machine is publicly accessible";
pub const DESC_AZURE_VM_PUBLIC: &str = "Virtual machine has a public IP address";
pub const REC_AZURE_VM_PUBLIC: &str = "Remove the public IP and use Azure Bastion or a load balancer";
pub const TITLE_AZURE_VM_UNENCRYPTED: &str = "Virtual machine disks are not encrypted";
pub const DESC_AZURE_VM_UNENCRYPTED: &str = "OS and data disks are not encrypted";
pub const REC_AZURE_VM_UNENCRYPTED: &str = "Enable Azure Disk Encryption or encryption at host";
pub const TITLE_AZURE_SQL_PUBLIC: &str = "SQL server allows public network access";
pub const DESC_AZURE_SQL_PUBLIC: &str = "SQL server is reachable from the internet";
pub const REC_AZURE_SQL_PUBLIC: &str = "Disable public network access and use private endpoints";
pub const TITLE_AZURE_SQL_UNENCRYPTED: &str = "SQL database is not encrypted";
pub const DESC_AZURE_SQL_UNENCRYPTED: &str = "Transparent data encryption is disabled";
pub const REC_AZURE_SQL_UNENCRYPTED: &str = "Enable transparent data encryption";
pub const TITLE_KEYVAULT_SOFT_DELETE: &str = "Key vault soft delete is disabled";
pub const DESC_KEYVAULT_SOFT_DELETE: &str = "Deleted keys, secrets and certificates cannot be recovered";
pub const REC_KEYVAULT_SOFT_DELETE: &str = "Enable soft delete and purge protection";

pub const TITLE_GCS_PUBLIC: &str = "Cloud Storage bucket is publicly accessible";
pub const DESC_GCS_PUBLIC: &str = "Bucket grants access to allUsers or allAuthenticatedUsers";
pub const REC_GCS_PUBLIC: &str = "Remove public IAM bindings and enable uniform bucket-level access";
pub const TITLE_GCS_UNENCRYPTED: &str = "Cloud Storage bucket has no customer managed key";
pub const DESC_GCS_UNENCRYPTED: &str = "Bucket is not configured with a customer managed encryption key";
pub const REC_GCS_UNENCRYPTED: &str = "Configure a default Cloud KMS key for the bucket";
pub const TITLE_GCE_PUBLIC: &str = "Compute instance is publicly accessible";
pub const DESC_GCE_PUBLIC: &str = "Instance has an external IP address";
pub const REC_GCE_PUBLIC: &str = "Remove the access config and use Cloud NAT or IAP for connectivity";
pub const TITLE_CLOUDSQL_PUBLIC: &str = "Cloud SQL instance is publicly accessible";
pub const DESC_CLOUDSQL_PUBLIC: &str = "Instance has a public IP with authorized networks";
pub const REC_CLOUDSQL_PUBLIC: &str = "Use private IP and the Cloud SQL Auth Proxy";
pub const TITLE_CLOUDSQL_UNENCRYPTED: &str = "Cloud SQL instance is not encrypted";
pub const DESC_CLOUDSQL_UNENCRYPTED: &str = "Instance is not encrypted with a customer managed key";
pub const REC_CLOUDSQL_UNENCRYPTED: &str = "Enable CMEK for the instance";

pub const TITLE_PCI_UNENCRYPTED: &str = "PCI-DSS scoped resource is not encrypted";
pub const DESC_PCI_UNENCRYPTED: &str = "Resource is in PCI-DSS scope but stores data without encryption at rest";
pub const REC_PCI_UNENCRYPTED: &str = "Enable encryption at rest to satisfy PCI-DSS requirement 3.4";
pub const TITLE_PUBLIC_GENERIC: &str = "Resource is publicly accessible";
pub const DESC_PUBLIC_GENERIC: &str = "Resource is reachable from the internet";
pub const REC_PUBLIC_GENERIC: &str = "Review whether public access is required and restrict it if not";

pub const TITLE_INCONSISTENT_ENCRYPTION: &str = "Inconsistent encryption within resource group";
pub const DESC_INCONSISTENT_ENCRYPTION: &str = "Other resources in the same environment and project are encrypted but this one is not";
pub const REC_INCONSISTENT_ENCRYPTION: &str = "Apply the same encryption settings to every resource in the group";
