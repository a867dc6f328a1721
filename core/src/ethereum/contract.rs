use alloy::sol;

sol! {
    /// English-only auction house: one struct getter, bids carry value directly.
    #[sol(rpc)]
    #[derive(Debug)]
    contract SimpleAuctionHouse {
        function auctionsCount() external view returns (uint256);

        function getAuction(uint256 auctionId) external view returns (
            address seller,
            uint256 startTime,
            uint256 endTime,
            uint256 reservePrice,
            uint256 minIncrement,
            uint256 buyItNowPrice,
            uint256 antiSnipingWindow,
            uint256 antiSnipingExtension,
            bool ended,
            string ipfsCid,
            address highestBidder,
            uint256 highestBid
        );

        function bid(uint256 auctionId) external payable;
        function endAuction(uint256 auctionId) external;
        function withdraw(uint256 auctionId) external returns (bool);

        event AuctionCreated(
            uint256 indexed auctionId,
            address indexed seller,
            uint256 startTime,
            uint256 endTime,
            string ipfsCid
        );
        event BidPlaced(uint256 indexed auctionId, address indexed bidder, uint256 amount);
        event AuctionExtended(uint256 indexed auctionId, uint256 newEndTime);
        event BuyItNowTriggered(uint256 indexed auctionId, address indexed buyer, uint256 amount);
        event AuctionEnded(uint256 indexed auctionId, address indexed winner, uint256 amount);
        event Withdrawn(uint256 indexed auctionId, address indexed bidder, uint256 amount);
    }
}

sol! {
    /// Multi-strategy manager. `auctionType` is 0 English, 1 sealed-bid,
    /// 2 Dutch, 3 Vickrey.
    #[sol(rpc)]
    #[derive(Debug)]
    contract AuctionManager {
        function auctionsCount() external view returns (uint256);

        function auctions(uint256 auctionId) external view returns (
            uint8 auctionType,
            uint256 startTime,
            uint256 biddingEndTime,
            uint256 revealEndTime,
            uint256 reservePrice,
            uint256 minIncrement,
            uint256 buyItNowPrice,
            uint256 antiSnipingWindow,
            uint256 antiSnipingExtension,
            bool ended,
            address seller,
            address nftAddress,
            uint256 tokenId,
            uint256 tokenAmount,
            bool isERC1155,
            string ipfsCid,
            bool requireVerification
        );

        function getEnglishState(uint256 auctionId) external view returns (address highestBidder, uint256 highestBid);
        function getSealedHighest(uint256 auctionId) external view returns (address highestBidder, uint256 highestBid);
        function getCurrentDutchPrice(uint256 auctionId) external view returns (uint256);

        function createAuction(
            uint8 auctionType,
            uint256 startTime,
            uint256 biddingEndTime,
            uint256 revealEndTime,
            uint256 reservePrice,
            uint256 minIncrement,
            uint256 buyItNowPrice,
            uint256 antiSnipingWindow,
            uint256 antiSnipingExtension
        ) external returns (uint256);
        function setAuctionNFT(
            uint256 auctionId,
            address nftAddress,
            uint256 tokenId,
            uint256 tokenAmount,
            bool isERC1155
        ) external;
        function setAuctionMetadata(uint256 auctionId, string ipfsCid, bool requireVerification) external;
        function setDutchPricing(
            uint256 auctionId,
            uint256 startPrice,
            uint256 endPrice,
            uint256 decrementPerSecond
        ) external;
        function verifyIdentity(uint8 v, bytes32 r, bytes32 s) external;

        function bid(uint256 auctionId) external payable;
        function commitBid(uint256 auctionId, bytes32 commitment) external;
        function revealBid(uint256 auctionId, uint256 amount, bytes32 secret) external payable;
        function acceptDutch(uint256 auctionId) external payable;
        function endAuction(uint256 auctionId) external;
        function withdraw(uint256 auctionId) external returns (bool);

        event AuctionCreated(
            uint256 indexed auctionId,
            uint8 auctionType,
            uint256 startTime,
            uint256 biddingEndTime,
            uint256 revealEndTime,
            uint256 reservePrice,
            uint256 minIncrement,
            uint256 buyItNowPrice
        );
        event BidCommitted(uint256 indexed auctionId, address indexed bidder, bytes32 commitment);
        event BidPlaced(uint256 indexed auctionId, address indexed bidder, uint256 amount);
        event AuctionExtended(uint256 indexed auctionId, uint256 newEndTime);
        event BuyItNowTriggered(uint256 indexed auctionId, address indexed buyer, uint256 amount);
        event AuctionEnded(uint256 indexed auctionId, address indexed winner, uint256 amount);
    }
}
